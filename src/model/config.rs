use serde::Deserialize;

/// What the assignment row of each KDV demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// `Σ x ≤ 1`: a KDV may stay unscheduled; the solve never fails because of it.
    #[default]
    AtMostOne,
    /// `Σ x = 1`: every modelled KDV must be scheduled or the solve is infeasible.
    Exact,
}

/// What to do with KDVs that have no feasible (slot, resource) pair at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibilityPolicy {
    /// Leave them out of the model and report them as unscheduled.
    #[default]
    Exclude,
    /// Refuse to build the model.
    Abort,
}

/// Knobs of the MIP formulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub assignment_policy: AssignmentPolicy,
    pub infeasibility_policy: InfeasibilityPolicy,
    /// Weight of a feasible triple that no preference mentions.
    pub default_preference: f64,
    /// Rescale each KDV's weights so they average 1 over its feasible triples.
    pub normalize_preferences: bool,
    /// Resources with strictly more months of experience count as experienced.
    pub experience_threshold_months: u32,
    /// Re-solve with the preference value held at its optimum to pick the
    /// canonically first schedule among equally good ones.
    pub tie_break: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            assignment_policy: AssignmentPolicy::AtMostOne,
            infeasibility_policy: InfeasibilityPolicy::Exclude,
            default_preference: 1.0,
            normalize_preferences: false,
            experience_threshold_months: 6,
            tie_break: true,
        }
    }
}

impl ModelConfig {
    pub fn with_assignment_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.assignment_policy = policy;
        self
    }

    pub fn with_infeasibility_policy(mut self, policy: InfeasibilityPolicy) -> Self {
        self.infeasibility_policy = policy;
        self
    }

    pub fn with_tie_break(mut self, enabled: bool) -> Self {
        self.tie_break = enabled;
        self
    }

    pub fn with_normalized_preferences(mut self, normalize: bool) -> Self {
        self.normalize_preferences = normalize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"assignment_policy": "exact", "tie_break": false}"#)
                .unwrap();
        assert_eq!(config.assignment_policy, AssignmentPolicy::Exact);
        assert!(!config.tie_break);
        assert_eq!(config.infeasibility_policy, InfeasibilityPolicy::Exclude);
        assert_eq!(config.experience_threshold_months, 6);
    }
}
