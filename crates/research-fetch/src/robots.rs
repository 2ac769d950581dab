// crates/research-fetch/src/robots.rs
// ============================================================================
// Module: Robots Policy
// Description: Minimal robots.txt parsing and per-path decisions.
// Purpose: Honor origin crawl policy for URL-type sources.
// Dependencies: none
// ============================================================================

//! ## Overview
//! URL sources honor per-host robots.txt. The parser keeps the subset the
//! engine needs: user-agent groups, Allow/Disallow rules with longest-match
//! precedence, and a permissive default when the file is absent or
//! unreadable. Rules for the engine's own user-agent token take precedence
//! over the wildcard group.

// ============================================================================
// SECTION: Types
// ============================================================================

/// One Allow/Disallow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RobotsRule {
    /// Path prefix the rule matches.
    path: String,
    /// True for Allow, false for Disallow.
    allow: bool,
}

/// Parsed robots policy for one host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsPolicy {
    /// Rules from the group matching the engine's user-agent.
    agent_rules: Vec<RobotsRule>,
    /// Rules from the wildcard group.
    wildcard_rules: Vec<RobotsRule>,
}

impl RobotsPolicy {
    /// Returns a policy that permits everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses robots.txt content for the given user-agent token.
    #[must_use]
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let agent_token = user_agent.to_ascii_lowercase();
        let mut policy = Self::default();
        // Agents named by the current group header block, lowercased.
        let mut current_agents: Vec<String> = Vec::new();
        // True once a rule line has been seen since the last agent header.
        let mut rules_seen = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    if rules_seen {
                        current_agents.clear();
                        rules_seen = false;
                    }
                    current_agents.push(value.to_ascii_lowercase());
                }
                "allow" | "disallow" => {
                    rules_seen = true;
                    if value.is_empty() && field == "disallow" {
                        // An empty Disallow permits everything; no rule needed.
                        continue;
                    }
                    let rule = RobotsRule {
                        path: value.to_string(),
                        allow: field == "allow",
                    };
                    for agent in &current_agents {
                        if agent == "*" {
                            policy.wildcard_rules.push(rule.clone());
                        } else if agent_token.contains(agent.as_str()) {
                            policy.agent_rules.push(rule.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        policy
    }

    /// Returns true when the path may be fetched.
    #[must_use]
    pub fn is_allowed(&self, path: &str) -> bool {
        let rules = if self.agent_rules.is_empty() { &self.wildcard_rules } else { &self.agent_rules };
        let mut best_len = 0usize;
        let mut allowed = true;
        for rule in rules {
            if path.starts_with(rule.path.as_str()) {
                let len = rule.path.len();
                if len > best_len || (len == best_len && rule.allow) {
                    best_len = len;
                    allowed = rule.allow;
                }
            }
        }
        allowed
    }
}
