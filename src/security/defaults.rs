use super::policy::{Category, SequencedCategory};

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| (*p).to_string()).collect()
}

/// Built-in rule table used when no rule file is configured.
#[must_use]
pub fn default_categories() -> Vec<Category> {
    vec![
        Category {
            name: "Illegal Activities".into(),
            phrases: phrases(&[
                "steal",
                "shoplift",
                "counterfeit",
                "launder money",
                "money laundering",
                "smuggle",
                "forge documents",
                "tax evasion",
            ]),
        },
        Category {
            name: "Cybersecurity Threats".into(),
            phrases: phrases(&[
                "hack",
                "malware",
                "ransomware",
                "phishing",
                "keylogger",
                "ddos",
                "botnet",
                "sql injection",
                "exploit kit",
            ]),
        },
        Category {
            name: "Violence".into(),
            phrases: phrases(&[
                "build a bomb",
                "make a weapon",
                "hurt someone",
                "poison someone",
            ]),
        },
        Category {
            name: "Hate Speech".into(),
            phrases: phrases(&["racial slur", "ethnic cleansing", "hate group"]),
        },
        Category {
            name: "Self-Harm".into(),
            phrases: phrases(&["hurt myself", "self-harm", "end my life"]),
        },
    ]
}

#[must_use]
pub fn default_sequenced() -> Vec<SequencedCategory> {
    vec![SequencedCategory {
        name: "Ghost Protocol".into(),
        phrases: phrases(&[
            "sub-semantic",
            "pythagorean",
            "ghostly imprint",
            "apparition",
        ]),
        require_pythagorean_triple: true,
    }]
}

#[must_use]
pub fn default_humor_markers() -> Vec<String> {
    phrases(&[
        "joke",
        "jokes",
        "funny",
        "make me laugh",
        "pun",
        "puns",
        "humor",
        "humorous",
        "comedy",
        "limerick",
    ])
}
