//! Ordered decision tables: rules are tried top to bottom, the first match
//! wins, and the table's default answers when nothing matches.

pub struct Rule<T> {
    pub name: &'static str,
    pub when: fn(&T) -> bool,
    pub outcome: &'static str,
}

pub struct RuleTable<T: 'static> {
    pub rules: &'static [Rule<T>],
    pub default: &'static str,
}

impl<T: 'static> RuleTable<T> {
    pub fn evaluate(&self, input: &T) -> &'static str {
        self.matching_rule(input)
            .map(|r| r.outcome)
            .unwrap_or(self.default)
    }

    /// The first rule that fires, or `None` when the default applies.
    pub fn matching_rule(&self, input: &T) -> Option<&'static Rule<T>> {
        self.rules.iter().find(|r| (r.when)(input))
    }
}
