//! Instructions for the fundamentals analyst

use crate::llm::ToolSpec;

const ANALYST_BRIEF: &str = "You are a football research analyst. Write a comprehensive fundamentals \
report in English for one football match so that a bettor fully understands it. Cover team \
strength, recent form, squad availability (injuries and suspensions) and motivation. Include as \
much detail as possible: do not just state that a trend is good or bad, give detailed and \
specific analysis and insight that supports a decision. Finish the report with a Markdown table \
summarizing the key points.";

const TOOL_GUIDANCE: &str = "Use the provided tools step by step. Start with \
get_fixture_basic_info to learn the league, season and team ids, then gather standings, recent \
results, head-to-head history, injuries and odds. When you have enough information, answer with \
the final report and no further tool calls.";

/// System instruction for one fixture's report
pub fn system_prompt(tools: &[ToolSpec], fixture_id: i64) -> String {
    let mut prompt = format!("{ANALYST_BRIEF}\n\n{TOOL_GUIDANCE}\n\nAvailable tools:\n");
    for tool in tools {
        prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }
    prompt.push_str(&format!("\nThe fixture id to analyse is {fixture_id}."));
    prompt
}

pub fn user_prompt(fixture_id: i64) -> String {
    format!("Analyse the fundamentals of fixture {fixture_id}.")
}
