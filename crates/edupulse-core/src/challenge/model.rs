use serde::{Deserialize, Serialize};

/// Shown when no remote provider is configured or generation failed.
pub const FALLBACK_FACT: &str = "The AI is napping! Did you know honey never spoils? \
Archaeologists found pots of honey in ancient Egyptian tombs over 3,000 years old \
that were still edible.";

/// A short prompt shown to win back attention after a breach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngagementChallenge {
    Joke {
        question: String,
        punchline: String,
    },
    FunFact {
        fact: String,
    },
    Counting {
        question: String,
        #[serde(rename = "correctAnswer")]
        correct_answer: u32,
        /// Displayable image, usually a `data:image/png;base64,...` URL.
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Joke,
    FunFact,
    Counting,
}

impl EngagementChallenge {
    pub fn fallback() -> Self {
        EngagementChallenge::FunFact {
            fact: FALLBACK_FACT.to_string(),
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        match self {
            EngagementChallenge::Joke { .. } => ChallengeKind::Joke,
            EngagementChallenge::FunFact { .. } => ChallengeKind::FunFact,
            EngagementChallenge::Counting { .. } => ChallengeKind::Counting,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, EngagementChallenge::FunFact { fact } if fact == FALLBACK_FACT)
    }

    /// Whether `answer` resolves the challenge successfully.
    ///
    /// Counting needs the exact integer and the whole (trimmed) answer must
    /// parse, so "3 robots" is rejected rather than read as 3. Jokes and facts
    /// only need to be acknowledged, so any answer counts.
    pub fn check_answer(&self, answer: &str) -> bool {
        match self {
            EngagementChallenge::Counting { correct_answer, .. } => answer
                .trim()
                .parse::<i64>()
                .is_ok_and(|n| n == i64::from(*correct_answer)),
            EngagementChallenge::Joke { .. } | EngagementChallenge::FunFact { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(answer: u32) -> EngagementChallenge {
        EngagementChallenge::Counting {
            question: "How many robots are waving?".into(),
            correct_answer: answer,
            image_url: "data:image/png;base64,AAAA".into(),
        }
    }

    #[test]
    fn counting_needs_exact_integer() {
        let c = counting(3);
        assert!(c.check_answer("3"));
        assert!(c.check_answer(" 3\n"));
        assert!(!c.check_answer("4"));
        assert!(!c.check_answer("three"));
        assert!(!c.check_answer(""));
        assert!(!c.check_answer("-3"));
    }

    #[test]
    fn counting_rejects_trailing_words() {
        let c = counting(3);
        assert!(!c.check_answer("3 robots"));
        assert!(!c.check_answer("3.0"));
    }

    #[test]
    fn joke_and_fact_always_resolve() {
        let joke = EngagementChallenge::Joke {
            question: "Why did the scarecrow win an award?".into(),
            punchline: "He was outstanding in his field.".into(),
        };
        assert!(joke.check_answer(""));
        assert!(EngagementChallenge::fallback().check_answer("cool"));
    }

    #[test]
    fn wire_format_uses_type_tag_and_camel_case_fields() {
        let json = serde_json::to_value(counting(5)).unwrap();
        assert_eq!(json["type"], "counting");
        assert_eq!(json["correctAnswer"], 5);
        assert!(json["imageUrl"].as_str().unwrap().starts_with("data:image/png"));

        let fact: EngagementChallenge =
            serde_json::from_str(r#"{"type":"fun_fact","fact":"Octopuses have three hearts."}"#).unwrap();
        assert_eq!(fact.kind(), ChallengeKind::FunFact);
        assert!(!fact.is_fallback());
    }

    #[test]
    fn fallback_is_the_honey_fact() {
        let fallback = EngagementChallenge::fallback();
        assert!(fallback.is_fallback());
        match fallback {
            EngagementChallenge::FunFact { fact } => {
                assert!(fact.starts_with("The AI is napping!"));
                assert!(fact.ends_with("still edible."));
            }
            other => panic!("unexpected fallback {other:?}"),
        }
    }
}
