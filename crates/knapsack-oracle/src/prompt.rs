//! Prompt construction for a need against a resource pool.

use knapsack_core::{Need, Resource};
use serde_json::{Map, Value};

use crate::types::ChatMessage;

const SYSTEM_PROMPT: &str = "\
You match needs to resources. Given one need and a numbered list of \
available resources, propose combinations of one or more resources that \
could satisfy the need.

Reply with a JSON array and nothing else. Each element must be an object:
{
  \"resource_ids\": [\"<id>\", ...],
  \"feasibility_score\": <integer 0-100>,
  \"explanation\": \"<why this combination works>\",
  \"gaps\": [\"<missing piece or obstacle>\", ...],
  \"confidence\": \"low\" | \"medium\" | \"high\"
}

Rules:
- Use only the ids shown after `id=` in the resource list, exactly as written.
- A combination may use a single resource or several.
- Order the array from most to least feasible.
- If nothing fits, reply with [].";

/// Build the message list sent to the oracle.
pub fn build_messages(need: &Need, resources: &[Resource]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(need, resources)),
    ]
}

/// The need followed by every resource, each tagged with its identifier.
pub fn build_user_prompt(need: &Need, resources: &[Resource]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Need:\n");
    prompt.push_str(&format!("id={}: {}", need.id, need.description.trim()));
    prompt.push_str(&render_context(&need.context()));
    prompt.push_str("\n\n");

    prompt.push_str(&format!("Available resources ({}):\n", resources.len()));
    for (i, resource) in resources.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] id={}: {}{}\n",
            i + 1,
            resource.id,
            resource.description.trim(),
            render_context(&resource.context()),
        ));
    }

    prompt
}

fn render_context(context: &Map<String, Value>) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" (metadata: {})", Value::Object(context.clone()))
    }
}
