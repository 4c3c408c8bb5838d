//! Operations and their fixed step lists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way the cluster is being resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Add hosts to the cluster.
    ScaleUp,
    /// Remove hosts from the cluster.
    ScaleDown,
}

const SCALE_UP_STEPS: &[Step] = &[
    Step::InstallHosts,
    Step::RegisterInCluster,
    Step::VerifyCommission,
    Step::WaitForParcels,
    Step::ApplyHostTemplate,
    Step::VerifyTags,
    Step::ApplyStaleConfigs,
];

const SCALE_DOWN_STEPS: &[Step] = &[Step::RemoveHosts, Step::ApplyStaleConfigs];

impl OperationKind {
    /// Steps of this operation, in execution order. `done` follows the last one.
    #[must_use]
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Self::ScaleUp => SCALE_UP_STEPS,
            Self::ScaleDown => SCALE_DOWN_STEPS,
        }
    }

    /// Position of a step in this operation, if it belongs to it.
    #[must_use]
    pub fn position(&self, step: Step) -> Option<usize> {
        self.steps().iter().position(|s| *s == step)
    }

    /// Action name as typed on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScaleUp => "scaleup",
            Self::ScaleDown => "scaledown",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One idempotent unit of cluster work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Install the agent on the target hosts.
    InstallHosts,
    /// Add the installed hosts to the cluster.
    RegisterInCluster,
    /// Check every target host is commissioned.
    VerifyCommission,
    /// Wait for the cluster parcel to be activated.
    WaitForParcels,
    /// Apply the host template to the target hosts.
    ApplyHostTemplate,
    /// Check every target host carries the template tag.
    VerifyTags,
    /// Deploy client configs and refresh the cluster.
    ApplyStaleConfigs,
    /// Remove the target hosts from the cluster.
    RemoveHosts,
}

impl Step {
    /// Every step, in no particular operation's order.
    pub const ALL: [Step; 8] = [
        Step::InstallHosts,
        Step::RegisterInCluster,
        Step::VerifyCommission,
        Step::WaitForParcels,
        Step::ApplyHostTemplate,
        Step::VerifyTags,
        Step::ApplyStaleConfigs,
        Step::RemoveHosts,
    ];

    /// Persisted name of the step.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InstallHosts => "install_hosts",
            Self::RegisterInCluster => "register_in_cluster",
            Self::VerifyCommission => "verify_commission",
            Self::WaitForParcels => "wait_for_parcels",
            Self::ApplyHostTemplate => "apply_host_template",
            Self::VerifyTags => "verify_tags",
            Self::ApplyStaleConfigs => "apply_stale_configs",
            Self::RemoveHosts => "remove_hosts",
        }
    }

    /// Short human description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::InstallHosts => "Installing agents on hosts",
            Self::RegisterInCluster => "Adding hosts to cluster",
            Self::VerifyCommission => "Verifying commission state",
            Self::WaitForParcels => "Waiting for parcel activation",
            Self::ApplyHostTemplate => "Applying host template",
            Self::VerifyTags => "Verifying host template tags",
            Self::ApplyStaleConfigs => "Deploying client configs",
            Self::RemoveHosts => "Removing hosts from cluster",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|step| step.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown step: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_up_order() {
        let names: Vec<_> = OperationKind::ScaleUp.steps().iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "install_hosts",
                "register_in_cluster",
                "verify_commission",
                "wait_for_parcels",
                "apply_host_template",
                "verify_tags",
                "apply_stale_configs",
            ]
        );
    }

    #[test]
    fn test_scale_down_order() {
        assert_eq!(
            OperationKind::ScaleDown.steps(),
            &[Step::RemoveHosts, Step::ApplyStaleConfigs]
        );
    }

    #[test]
    fn test_position() {
        assert_eq!(OperationKind::ScaleUp.position(Step::ApplyHostTemplate), Some(4));
        assert_eq!(OperationKind::ScaleDown.position(Step::InstallHosts), None);
    }

    #[test]
    fn test_step_names_parse_back() {
        for step in Step::ALL {
            assert_eq!(step.name().parse::<Step>().unwrap(), step);
        }
        assert!("done".parse::<Step>().is_err());
    }

    #[test]
    fn test_step_names_unique() {
        let mut names: Vec<_> = Step::ALL.iter().map(Step::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Step::ALL.len());
    }
}
