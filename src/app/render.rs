use promptgate::security::{Decision, PolicyRules};

/// Human-readable summary of a rule table.
pub fn render_rules(rules: &PolicyRules, source: &str) -> String {
    let mut lines = vec![format!("◆ Policy rules ({source})"), String::new()];

    lines.push(format!("  Categories ({})", rules.categories.len()));
    for category in &rules.categories {
        lines.push(format!(
            "    {:<24} {} phrase(s)",
            category.name,
            category.phrases.len()
        ));
    }

    if !rules.sequenced.is_empty() {
        lines.push(String::new());
        lines.push(format!("  Sequenced ({})", rules.sequenced.len()));
        for seq in &rules.sequenced {
            let triple = if seq.require_pythagorean_triple {
                " + pythagorean triple"
            } else {
                ""
            };
            lines.push(format!(
                "    {:<24} {} ordered phrase(s){triple}",
                seq.name,
                seq.phrases.len()
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "  Tone            {} ({} marker(s))",
        rules.tone.name,
        rules.tone.phrases.len()
    ));
    lines.join("\n")
}

/// One-line verdict for stderr.
pub fn render_decision(decision: &Decision) -> String {
    if decision.admitted {
        return if decision.tone_flag {
            "✅ admitted (tone flagged)".to_string()
        } else {
            "✅ admitted".to_string()
        };
    }
    let details: Vec<String> = decision
        .matches
        .iter()
        .map(|(category, evidence)| format!("{category}: {}", evidence.join(", ")))
        .collect();
    format!("⛔ denied. {}", details.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_summary_lists_every_category() {
        let rules = PolicyRules::default();
        let text = render_rules(&rules, "built-in");
        for category in &rules.categories {
            assert!(text.contains(&category.name));
        }
        assert!(text.contains("Ghost Protocol"));
        assert!(text.contains("pythagorean triple"));
    }

    #[test]
    fn decision_summary_names_evidence() {
        let mut decision = Decision::admit();
        assert_eq!(render_decision(&decision), "✅ admitted");
        decision.matches.insert("Violence".into(), vec!["assault".into()]);
        decision.admitted = false;
        assert!(render_decision(&decision).contains("Violence: assault"));
    }
}
