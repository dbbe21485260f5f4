use crate::models::AuditData;

const REPORT_TITLE: &str = "AI-SEO Audit Report";

/// Wraps a field in double quotes, doubling any embedded quote.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quotes only when the value would otherwise break the row.
pub fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quote_field(value)
    } else {
        value.to_string()
    }
}

pub fn to_delimited_text(record: &AuditData) -> String {
    let input = &record.input;
    let audit = &record.audit;
    let mut out = String::new();

    out.push_str(&format!("{}\n", REPORT_TITLE));
    out.push_str(&format!("Website,{}\n", csv_cell(&input.website)));
    out.push_str(&format!("Region,{}\n", csv_cell(&input.region)));
    out.push_str(&format!("Audience,{}\n", csv_cell(&input.audience)));
    out.push_str(&format!("SEO Score,{}\n", audit.seo_score));
    out.push_str(&format!("AI Citation Score,{}\n", audit.ai_citation_score));
    out.push_str(&format!("Critical Issues,{}\n", audit.critical_issues));
    out.push_str(&format!("Target Questions,{}\n", quote_field(&input.target_questions.join("; "))));
    out.push_str(&format!("Competitors,{}\n\n", quote_field(&input.competitors.join("; "))));

    out.push_str("SEO Issues\n");
    out.push_str("Issue,Page,Impact,Recommendation\n");
    for issue in &audit.seo_issues {
        out.push_str(&format!(
            "{},{},{},{}\n",
            quote_field(&issue.issue),
            quote_field(&issue.page),
            quote_field(issue.impact.as_str()),
            quote_field(&issue.recommendation)
        ));
    }
    out.push('\n');

    out.push_str("Quick Win Recommendations\n");
    out.push_str("Recommendation\n");
    for win in &audit.quick_wins {
        out.push_str(&format!("{}\n", quote_field(win)));
    }
    out.push('\n');

    out.push_str("Traffic Forecast\n");
    out.push_str("Month,Clicks,Type\n");
    for point in &audit.forecast.traffic_data {
        out.push_str(&format!("{},{},{}\n", csv_cell(&point.month), point.clicks, point.kind.as_str()));
    }

    if let Some(profile) = &audit.citations_profile {
        out.push_str("\nCitations Profile\n");
        out.push_str(&format!("DR Score,{}\n", profile.dr));
        out.push_str(&format!("Backlinks,{}\n", profile.backlinks));
        out.push_str(&format!("Referring Domains,{}\n", profile.ref_domains));
    }

    if let Some(visibility) = &audit.ai_visibility {
        out.push_str("\nAI Visibility Comparison\n");
        out.push_str("Domain,Citations,SERP Mentions\n");
        for entry in &visibility.comparison {
            out.push_str(&format!("{},{},{}\n", csv_cell(&entry.domain), entry.citations, entry.serp_mentions));
        }
    }

    out
}

pub fn to_plain_text(record: &AuditData) -> String {
    let input = &record.input;
    let audit = &record.audit;
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", REPORT_TITLE.to_uppercase()));
    out.push_str(&format!("Website: {}\n", input.website));
    out.push_str(&format!("Region: {}\n", input.region));
    out.push_str(&format!("Audience: {}\n", input.audience));
    out.push_str(&format!("Generated: {}\n", record.meta.last_updated.format("%Y-%m-%d")));

    push_heading(&mut out, "EXECUTIVE SUMMARY", 17);
    out.push_str(&format!("SEO Score: {}/100\n", audit.seo_score));
    out.push_str(&format!("AI Citation Score: {}/100\n", audit.ai_citation_score));
    out.push_str(&format!("Critical Issues: {}\n", audit.critical_issues));

    push_heading(&mut out, "TARGET QUESTIONS", 18);
    push_numbered(&mut out, &input.target_questions);

    push_heading(&mut out, "COMPETITORS ANALYZED", 22);
    push_numbered(&mut out, &input.competitors);

    push_heading(&mut out, "SEO ISSUES IDENTIFIED", 23);
    // Each issue block opens with a blank line; blocks are separated by one more.
    for (index, issue) in audit.seo_issues.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&format!("{}. {}\n", index + 1, issue.issue));
        out.push_str(&format!("   Page: {}\n", issue.page));
        out.push_str(&format!("   Impact: {}\n", issue.impact.as_str()));
        out.push_str(&format!("   Recommendation: {}\n", issue.recommendation));
    }
    out.push('\n');

    push_heading(&mut out, "QUICK WIN OPPORTUNITIES", 25);
    push_numbered(&mut out, &audit.quick_wins);

    push_heading(&mut out, "TRAFFIC FORECAST", 18);
    for point in &audit.forecast.traffic_data {
        out.push_str(&format!("{}: {} clicks ({})\n", point.month, point.clicks, point.kind.as_str()));
    }

    if let Some(profile) = &audit.citations_profile {
        out.push('\n');
        push_heading(&mut out, "CITATIONS PROFILE", 19);
        out.push_str(&format!("DR Score: {}\n", profile.dr));
        out.push_str(&format!("Backlinks: {}\n", profile.backlinks));
        out.push_str(&format!("Referring Domains: {}\n", profile.ref_domains));
    }

    out
}

fn push_heading(out: &mut String, heading: &str, rule_width: usize) {
    out.push('\n');
    out.push_str(heading);
    out.push('\n');
    out.push_str(&"═".repeat(rule_width));
    out.push('\n');
}

fn push_numbered(out: &mut String, items: &[String]) {
    for (index, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, item));
    }
}
