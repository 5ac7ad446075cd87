//! Tool-selection prompt construction.
//!
//! The prompt is a pure function of the catalog and the instruction text:
//! the tool list in catalog order, the quoted instruction, worked examples
//! for every tool category, and the required reply format.

use crate::tools::ToolCatalog;

const PREAMBLE: &str =
    "You are an AI agent that needs to select the appropriate tool to handle a user's request.";

const GUIDANCE: &str = "\
Based on the user's request, determine which tool to use and extract the necessary parameters.

Note: For system-related questions like \"What tools are available?\", \"Show me the architecture\", \"How does this work?\", \"What can you do?\", use the system_info_tool.

Important: For any DELETE operation on the database, you must require a security_password parameter. Do not allow DELETE queries without this password.";

const REPLY_FORMAT: &str = r#"Respond ONLY with a JSON object in this exact format:
{
    "tool": "tool_name",
    "parameters": {
        "param_name": "param_value"
    }
}"#;

/// Worked request → selection examples, one per line.
const EXAMPLES: &[&str] = &[
    r#"For weather queries: {"tool": "weather_tool", "parameters": {"location": "Paris"}}"#,
    r#"For database SELECT queries: {"tool": "sql_tool", "parameters": {"sql_query": "SELECT * FROM users"}}"#,
    r#"For user count queries: {"tool": "sql_tool", "parameters": {"sql_query": "SELECT COUNT(*) FROM users"}}"#,
    r#"For prompts like "How many users are in the system?", "User count", "Number of users": {"tool": "sql_tool", "parameters": {"sql_query": "SELECT COUNT(*) FROM users"}}"#,
    r#"For prompts like "show all users", "list all users", "display all users", "who are the users", "get all users", "show me everyone in the database", "give me a list of users": {"tool": "sql_tool", "parameters": {"sql_query": "SELECT * FROM users"}}"#,
    r#"For database INSERT queries: {"tool": "sql_tool", "parameters": {"sql_query": "INSERT INTO users (name, email) VALUES ('John Doe', 'john@example.com')"}}"#,
    r#"For database UPDATE queries: {"tool": "sql_tool", "parameters": {"sql_query": "UPDATE users SET email = 'alice@newdomain.com' WHERE name = 'Alice'"}}"#,
    r#"For deleting a user: {"tool": "sql_tool", "parameters": {"sql_query": "DELETE FROM users WHERE name = 'Michael Scott'", "security_password": "your_password"}}"#,
    r#"For prompts like "remove user Michael Scott", "delete user Michael Scott", "delete Michael Scott from the users", "remove Michael Scott from the database", "delete the user named Michael Scott": {"tool": "sql_tool", "parameters": {"sql_query": "DELETE FROM users WHERE name = 'Michael Scott'", "security_password": "your_password"}}"#,
    r#"For prompts like "delete a user", "remove a user", "delete someone from the users": {"tool": "sql_tool", "parameters": {"sql_query": "DELETE FROM users WHERE name = '<user_name>'", "security_password": "your_password"}}"#,
    r#"For SpaceX queries: {"tool": "graphql_tool", "parameters": {"query": "recent launches"}}"#,
    r#"For system info queries: {"tool": "system_info_tool", "parameters": {"query": "architecture"}}"#,
];

const NO_MATCH: &str = r#"If no tool matches the request, respond with:
{"tool": "none", "parameters": {}}"#;

/// Render one catalog line: `- name: description [Parameters: p (type), ...]`.
fn render_tool_line(spec: &crate::tools::ToolSpec) -> String {
    let mut line = format!("- {}: {}", spec.name, spec.description);
    if !spec.parameters.is_empty() {
        let params: Vec<String> = spec
            .parameters
            .iter()
            .map(|(name, p)| format!("{name} ({})", p.param_type))
            .collect();
        line.push_str(&format!(" [Parameters: {}]", params.join(", ")));
    }
    line
}

/// Build the classification prompt for one instruction.
pub fn build_selection_prompt(catalog: &ToolCatalog, instruction: &str) -> String {
    let tools: Vec<String> = catalog.iter().map(render_tool_line).collect();
    let examples: Vec<String> = EXAMPLES.iter().map(|e| format!("- {e}")).collect();

    format!(
        "{PREAMBLE}\n\nAvailable tools:\n{}\n\nUser query: \"{instruction}\"\n\n{GUIDANCE}\n\n{REPLY_FORMAT}\n\nExamples:\n{}\n\n{NO_MATCH}\n\nJSON response:\n",
        tools.join("\n"),
        examples.join("\n"),
    )
}
