use crate::a2a::{AgentCapabilities, AgentCard, AgentSkill, PROTOCOL_VERSION};
use crate::agent::Agent;

/// Describes `agent` for discovery: one skill for the agent's own model
/// behaviour and one per tool.
pub fn build_agent_card(agent: &Agent, url: &str) -> AgentCard {
    let mut model_description = agent.description().to_string();
    if let Some(instruction) = agent.instruction() {
        if !model_description.is_empty() {
            model_description.push(' ');
        }
        model_description.push_str(instruction.trim());
    }

    let mut skills = vec![AgentSkill {
        id: agent.name().to_string(),
        name: "model".to_string(),
        description: model_description,
        tags: vec!["llm".to_string()],
        examples: Vec::new(),
    }];

    skills.extend(agent.tools().iter().map(|tool| AgentSkill {
        id: format!("{}-{}", agent.name(), tool.name()),
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        tags: vec!["llm".to_string(), "tools".to_string()],
        examples: Vec::new(),
    }));

    AgentCard {
        name: agent.name().to_string(),
        description: agent.description().to_string(),
        url: url.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        preferred_transport: "JSONRPC".to_string(),
        capabilities: AgentCapabilities::default(),
        default_input_modes: vec!["text/plain".to_string()],
        default_output_modes: vec!["text/plain".to_string()],
        skills,
    }
}
