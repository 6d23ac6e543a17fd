use edupulse_core::{ChallengeProvider, EngagementChallenge};

use super::{load_config, print_json, runtime, CmdResult};

pub fn run(json: bool) -> CmdResult {
    let config = load_config()?;
    let provider = ChallengeProvider::new(&config.challenge);
    let challenge = runtime()?.block_on(provider.generate());

    if json {
        return print_json(&challenge);
    }
    println!("{}", describe(&challenge));
    Ok(())
}

/// Human-readable rendering, shared with the session loop.
pub(crate) fn describe(challenge: &EngagementChallenge) -> String {
    match challenge {
        EngagementChallenge::Joke {
            question,
            punchline,
        } => format!("Joke: {question}\n  ... {punchline}"),
        EngagementChallenge::FunFact { fact } => format!("Fun fact: {fact}"),
        EngagementChallenge::Counting {
            question,
            image_url,
            ..
        } => {
            let preview: String = image_url.chars().take(48).collect();
            format!("Counting: {question}\n  image: {preview}...")
        }
    }
}
