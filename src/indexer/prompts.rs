use crate::config::QualityTier;
use crate::llm::Message;

const SYSTEM_PROMPT: &str = "You document source code for other engineers. \
Read the file you are given and answer with a single JSON object and nothing else. \
Report only what the code actually contains.";

const DEPENDENCY_RULES: &str = "Dependency types:
- \"import\" for libraries and packages
- \"api_call\" for HTTP/REST calls to other services
- \"grpc\" for gRPC services
- \"database\" for database or cache connections
- \"event\" for queues, topics and other messaging
Shell commands are not dependencies.";

const CONFIG_RULES: &str = "For configuration files (YAML, TOML, .env, .properties, JSON config) \
quote the actual configured values (ports, URLs, topic names, flags) instead of describing them.";

fn lite_schema() -> &'static str {
    r#"{
  "summary": "2-3 sentences on what the file does, with concrete values such as ports, routes and service names",
  "purpose": "one sentence on the file's role in the project",
  "dependencies": [{"name": "package or service", "type": "import|api_call|grpc|database|event"}]
}"#
}

fn normal_schema() -> &'static str {
    r#"{
  "summary": "2-3 sentences on what the file does, with concrete values such as ports, routes, env vars and service names",
  "purpose": "one sentence on the file's role in the project",
  "functions": [{
    "name": "name",
    "signature": "full signature",
    "summary": "what it does",
    "parameters": [{"name": "p", "type": "t", "description": "meaning"}],
    "returns": "type and meaning",
    "line_start": 0,
    "line_end": 0
  }],
  "classes": [{
    "name": "type name",
    "summary": "what it represents",
    "methods": [],
    "fields": [{"name": "f", "type": "t", "description": "what it stores"}],
    "line_start": 0,
    "line_end": 0
  }],
  "dependencies": [{"name": "package or service", "type": "import|api_call|grpc|database|event"}],
  "key_logic": ["important rules or algorithms, with concrete values"]
}"#
}

fn tier_instructions(tier: QualityTier) -> (&'static str, &'static str) {
    match tier {
        QualityTier::Lite => ("Analyze", lite_schema()),
        QualityTier::Normal => ("Analyze", normal_schema()),
        QualityTier::Max => ("Thoroughly analyze", normal_schema()),
    }
}

/// Builds the system and user messages for one file.
pub fn build_messages(
    tier: QualityTier,
    file_path: &str,
    content: &str,
    language: &str,
) -> Vec<Message> {
    let (verb, schema) = tier_instructions(tier);
    let mut prompt = format!(
        "{} this {} file and return a JSON object with exactly these fields:\n\n{}\n\n{}\n\n{}\n",
        verb, language, schema, DEPENDENCY_RULES, CONFIG_RULES
    );

    match tier {
        QualityTier::Lite => {}
        QualityTier::Normal => {
            prompt.push_str("\nOmit empty arrays. Use 0 for unknown line numbers.\n");
        }
        QualityTier::Max => {
            prompt.push_str(
                "\nCover every function, method, type and significant constant. \
Describe error handling and edge cases, and note references to other files or modules. \
Omit empty arrays. Use 0 for unknown line numbers.\n",
            );
        }
    }

    prompt.push_str(&format!(
        "\nFile path: {}\n\n```{}\n{}\n```",
        file_path, language, content
    ));

    vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
}
