//! The contract handed to the external agent that co-writes the document.

use super::document::{Node, NodeKind, NodeStatus};

/// File name of the shared document inside the agent's working directory.
pub const GRAPH_FILE_NAME: &str = "knowledge_graph.json";

/// Longest label a pending task node gets before it is truncated.
pub const PENDING_LABEL_CHARS: usize = 60;

/// Instructions appended to every unit of work sent to the agent.
pub const AGENT_GRAPH_INSTRUCTIONS: &str = r#"
IMPORTANT: After completing the above task, you MUST read the existing knowledge_graph.json (if it exists) and then write an updated version. This graph tracks YOUR work: what the user asked for and what you built in response.

Node types:
- "task": A user request or command you just completed (label = short description of what was asked)
- "concept": A feature, system, or idea involved (label = feature name)
- "file": A file you created or modified (label = filename, path = relative path)

Edge types:
- "implements": file implements a concept/feature
- "produces": task produces a file
- "requires": one thing depends on another
- "relates_to": conceptual relationship
- "modifies": task modifies an existing file

Write knowledge_graph.json with this schema:
{
  "nodes": [
    {"id": "unique_id", "type": "task|concept|file", "label": "display name", "path": "file path (files only)", "summary": "brief description", "status": "created|modified|completed|pending"}
  ],
  "edges": [
    {"source": "node_id", "target": "node_id", "type": "implements|produces|requires|relates_to|modifies"}
  ]
}

Rules:
- Preserve ALL existing nodes and edges from the current knowledge_graph.json
- Add exactly one "task" node for THIS command you just completed
- Add "file" nodes for every file you created or modified
- Add "concept" nodes for features/systems involved
- Connect them with appropriate edges
- Do NOT scan or map pre-existing project files that you didn't touch"#;

/// Append the graph instructions to a unit of work.
pub fn with_graph_instructions(prompt: &str) -> String {
	format!("{prompt}\n{AGENT_GRAPH_INSTRUCTIONS}")
}

/// The node the server shows the moment a unit of work is dispatched.
pub fn pending_task_node(text: &str, dispatched_at_millis: u64) -> Node {
	let label = if text.chars().count() > PENDING_LABEL_CHARS {
		let head: String = text.chars().take(PENDING_LABEL_CHARS).collect();
		format!("{head}...")
	} else {
		text.to_string()
	};
	Node::new(format!("task_{dispatched_at_millis}"), NodeKind::Task, label)
		.with_summary(text)
		.with_status(NodeStatus::Pending)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_text_is_used_verbatim() {
		let node = pending_task_node("Add login", 1700);
		assert_eq!(node.id, "task_1700");
		assert_eq!(node.kind, NodeKind::Task);
		assert_eq!(node.label, "Add login");
		assert_eq!(node.summary.as_deref(), Some("Add login"));
		assert_eq!(node.status, Some(NodeStatus::Pending));
	}

	#[test]
	fn long_text_is_truncated_on_char_boundaries() {
		let text = "é".repeat(75);
		let node = pending_task_node(&text, 1);
		assert_eq!(node.label.chars().count(), PENDING_LABEL_CHARS + 3);
		assert!(node.label.ends_with("..."));
		assert_eq!(node.summary.as_deref(), Some(text.as_str()));
	}

	#[test]
	fn instructions_follow_the_prompt() {
		let prompt = with_graph_instructions("Build a parser");
		assert!(prompt.starts_with("Build a parser\n"));
		assert!(prompt.contains(GRAPH_FILE_NAME));
	}
}
