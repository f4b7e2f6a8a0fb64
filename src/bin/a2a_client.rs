use std::env;
use std::error::Error;

use prime_agent::a2a::{A2aClient, Part, format_agent_card};

const DEFAULT_AGENT_URL: &str = "http://localhost:8086";

/// Usage: `a2a-client [URL] [MESSAGE...]`. `AGENT_URL` overrides the default URL.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let (url_arg, prompt_words) = split_url_arg(env::args().skip(1).collect());
    let base_url = url_arg.unwrap_or_else(|| {
        env::var("AGENT_URL").unwrap_or_else(|_| DEFAULT_AGENT_URL.to_string())
    });

    let client = A2aClient::new(base_url)?;
    let card = client.fetch_agent_card().await?;
    println!("{}", format_agent_card(&card));

    let prompt = prompt_words.join(" ");
    if prompt.trim().is_empty() {
        return Ok(());
    }

    let task = client.send_message(prompt, None).await?;
    println!("task: {} ({:?})", task.id, task.status.state);

    let texts = task
        .artifacts
        .iter()
        .flat_map(|artifact| artifact.parts.iter())
        .chain(task.status.message.iter().flat_map(|message| message.parts.iter()))
        .filter_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();

    match texts.first() {
        Some(text) => println!("{text}"),
        None => println!("(no text in response)"),
    }
    Ok(())
}

/// Takes a leading `http://` or `https://` argument as the agent URL.
fn split_url_arg(mut args: Vec<String>) -> (Option<String>, Vec<String>) {
    let is_url = args.first().is_some_and(|arg| {
        let arg = arg.to_ascii_lowercase();
        arg.starts_with("http://") || arg.starts_with("https://")
    });

    if is_url {
        let url = args.remove(0);
        (Some(url), args)
    } else {
        (None, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn leading_url_is_split_from_prompt() {
        let (url, prompt) = split_url_arg(words("https://agents.local:8086 is 7 prime?"));
        assert_eq!(url.as_deref(), Some("https://agents.local:8086"));
        assert_eq!(prompt, words("is 7 prime?"));
    }

    #[test]
    fn prompt_starting_with_http_is_not_a_url() {
        let (url, prompt) = split_url_arg(words("https is a protocol, is 7 prime?"));
        assert!(url.is_none());
        assert_eq!(prompt.len(), 7);

        let (url, _) = split_url_arg(words("httpbin 13"));
        assert!(url.is_none());
    }

    #[test]
    fn no_arguments() {
        let (url, prompt) = split_url_arg(Vec::new());
        assert!(url.is_none());
        assert!(prompt.is_empty());
    }
}
