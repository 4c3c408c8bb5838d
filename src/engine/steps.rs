//! What each workflow step does against the control plane.

use super::step::Step;
use crate::error::ScaleError;
use crate::hosts::HostSet;
use cmclient::{
    ApiGateway, ApiHost, ApiHostRef, ApiList, ApiParcel, CommandPoller, HostInstallArgs,
    HostsToRemove, PollConfig, poll_until,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::time::Duration;

/// Tag the control plane sets on hosts a template was applied to.
pub const TEMPLATE_TAG: &str = "_cldr_cm_host_template_name";

/// Commission state of a host ready to take roles.
pub const COMMISSIONED: &str = "COMMISSIONED";

/// Stage of a parcel in use by the cluster.
pub const ACTIVATED: &str = "ACTIVATED";

/// Default budget for parcel activation: 60 checks, 10 seconds apart.
pub fn default_parcel_poll() -> PollConfig {
    PollConfig::new(60, Duration::from_secs(10))
}

/// SSH access used to install agents.
#[derive(Debug, Clone, Default)]
pub struct SshSettings {
    pub user: String,
    pub port: u16,
    pub password: String,
    pub private_key: String,
    pub passphrase: String,
}

/// Cluster-level settings for the steps.
#[derive(Debug, Clone, Default)]
pub struct ClusterSettings {
    pub cluster: String,
    pub template: String,
    /// Expected value of [`TEMPLATE_TAG`] after the template is applied.
    pub tag: String,
    pub repo_url: Option<String>,
    pub ssh: SshSettings,
}

/// Executes a single step.
///
/// Implementations must be safe to re-run from scratch: a resumed workflow
/// repeats the interrupted step in full.
pub trait StepRunner {
    /// Run `step` to completion or fail.
    fn run(&self, step: Step) -> Result<(), ScaleError>;
}

/// Payload for agent installation. A non-empty password wins over the key.
pub fn install_args(hosts: &HostSet, settings: &ClusterSettings) -> HostInstallArgs {
    let ssh = &settings.ssh;
    let mut args = HostInstallArgs {
        host_names: hosts.names().to_vec(),
        ssh_port: ssh.port,
        user_name: ssh.user.clone(),
        cm_repo_url: settings.repo_url.clone(),
        ..Default::default()
    };
    if !ssh.password.is_empty() {
        args.password = Some(ssh.password.clone());
    } else {
        args.private_key = Some(ssh.private_key.clone());
        args.passphrase = Some(ssh.passphrase.clone());
    }
    args
}

/// Whether the cluster's parcels are ready: at least one parcel, exactly one activated.
pub fn parcels_ready(parcels: &[ApiParcel]) -> bool {
    let activated = parcels.iter().filter(|p| p.stage == ACTIVATED).count();
    !parcels.is_empty() && activated == 1
}

/// Bytes escaped in a URL path segment: everything but unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode one URL path segment.
fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Steps backed by the control-plane API.
pub struct ClusterSteps<'a> {
    gateway: &'a ApiGateway,
    poller: &'a CommandPoller,
    settings: &'a ClusterSettings,
    hosts: &'a HostSet,
    parcel_poll: PollConfig,
}

impl<'a> ClusterSteps<'a> {
    pub fn new(
        gateway: &'a ApiGateway,
        poller: &'a CommandPoller,
        settings: &'a ClusterSettings,
        hosts: &'a HostSet,
    ) -> Self {
        Self {
            gateway,
            poller,
            settings,
            hosts,
            parcel_poll: default_parcel_poll(),
        }
    }

    /// Override the parcel activation budget.
    pub fn with_parcel_poll(mut self, config: PollConfig) -> Self {
        self.parcel_poll = config;
        self
    }

    fn cluster_path(&self, rest: &str) -> String {
        format!("/clusters/{}{}", segment(&self.settings.cluster), rest)
    }

    /// Cluster members, or `None` when simulated.
    fn cluster_hosts(&self) -> Result<Option<Vec<ApiHost>>, ScaleError> {
        let path = self.cluster_path("/hosts");
        let list = self.gateway.get(&path)?.json::<ApiList<ApiHost>>(&path)?;
        Ok(list.map(|l| l.items))
    }

    /// Target hosts for which `ok` does not hold, in host list order.
    fn offenders<F>(&self, known: &[ApiHost], ok: F) -> Vec<String>
    where
        F: Fn(&ApiHost) -> bool,
    {
        let mut offenders: Vec<String> = Vec::new();
        for name in self.hosts.names() {
            let passes = known.iter().find(|h| &h.hostname == name).is_some_and(&ok);
            if !passes && !offenders.contains(name) {
                offenders.push(name.clone());
            }
        }
        offenders
    }

    fn install_hosts(&self) -> Result<(), ScaleError> {
        let path = "/cm/commands/hostInstall";
        let args = install_args(self.hosts, self.settings);
        let reply = self.gateway.post(path, &args)?;
        self.poller.wait_for_reply(self.gateway, path, &reply)?;
        Ok(())
    }

    fn register_in_cluster(&self) -> Result<(), ScaleError> {
        let known = self.gateway.get("/hosts")?.json::<ApiList<ApiHost>>("/hosts")?;

        let refs: Vec<ApiHostRef> = match known {
            Some(list) => {
                let missing = self.offenders(&list.items, |_| true);
                if !missing.is_empty() {
                    return Err(ScaleError::verification(
                        "unknown to the control plane",
                        missing,
                    ));
                }
                list.items
                    .iter()
                    .filter(|h| self.hosts.contains(&h.hostname))
                    .map(|h| ApiHostRef::by_id(h.host_id.clone()))
                    .collect()
            }
            // Identifiers are only known once the hosts really exist.
            None => self.hosts.names().iter().map(ApiHostRef::by_name).collect(),
        };

        log::info!(
            "Adding {} hosts to cluster {}",
            refs.len(),
            self.settings.cluster
        );
        self.gateway
            .post(&self.cluster_path("/hosts"), &ApiList::new(refs))?;
        Ok(())
    }

    fn verify_commission(&self) -> Result<(), ScaleError> {
        let Some(known) = self.cluster_hosts()? else {
            log::info!("Commission check skipped (simulated)");
            return Ok(());
        };
        let offenders = self.offenders(&known, |h| {
            h.commission_state.as_deref() == Some(COMMISSIONED)
        });
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(ScaleError::verification("commission state", offenders))
        }
    }

    fn wait_for_parcels(&self) -> Result<(), ScaleError> {
        let path = self.cluster_path("/parcels");
        let ready = poll_until(
            &self.parcel_poll,
            Some(self.poller.callback()),
            "parcel activation",
            |_| match self.gateway.get(&path)?.json::<ApiList<ApiParcel>>(&path)? {
                Some(list) => Ok(parcels_ready(&list.items).then_some(())),
                None => Ok(Some(())),
            },
        )?;

        ready.ok_or_else(|| ScaleError::CommandTimeout {
            what: "parcel activation".to_string(),
            attempts: self.parcel_poll.max_attempts,
        })
    }

    fn apply_host_template(&self) -> Result<(), ScaleError> {
        let endpoint = self.cluster_path(&format!(
            "/hostTemplates/{}/commands/applyHostTemplate",
            segment(&self.settings.template)
        ));
        let path = format!("{}?startRoles=true&runConfigRules=false", endpoint);
        let refs: Vec<ApiHostRef> = self.hosts.names().iter().map(ApiHostRef::by_name).collect();

        let reply = self.gateway.post(&path, &ApiList::new(refs))?;
        self.poller.wait_for_reply(self.gateway, &endpoint, &reply)?;
        Ok(())
    }

    fn verify_tags(&self) -> Result<(), ScaleError> {
        let Some(known) = self.cluster_hosts()? else {
            log::info!("Tag check skipped (simulated)");
            return Ok(());
        };
        let expected = self.settings.tag.as_str();
        let offenders = self.offenders(&known, |h| h.tag(TEMPLATE_TAG) == Some(expected));
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(ScaleError::verification(
                format!("{} != {}", TEMPLATE_TAG, expected),
                offenders,
            ))
        }
    }

    fn apply_stale_configs(&self) -> Result<(), ScaleError> {
        let path = self.cluster_path("/commands/deployClientConfigsAndRefresh");
        let reply = self.gateway.post_empty(&path)?;
        self.poller.wait_for_reply(self.gateway, &path, &reply)?;
        Ok(())
    }

    fn remove_hosts(&self) -> Result<(), ScaleError> {
        let path = "/hosts/removeHostsFromCluster";
        let args = HostsToRemove {
            hosts_to_remove: self.hosts.names().to_vec(),
            delete_hosts: true,
        };
        let reply = self.gateway.post(path, &args)?;
        self.poller.wait_for_reply(self.gateway, path, &reply)?;
        Ok(())
    }
}

impl StepRunner for ClusterSteps<'_> {
    fn run(&self, step: Step) -> Result<(), ScaleError> {
        match step {
            Step::InstallHosts => self.install_hosts(),
            Step::RegisterInCluster => self.register_in_cluster(),
            Step::VerifyCommission => self.verify_commission(),
            Step::WaitForParcels => self.wait_for_parcels(),
            Step::ApplyHostTemplate => self.apply_host_template(),
            Step::VerifyTags => self.verify_tags(),
            Step::ApplyStaleConfigs => self.apply_stale_configs(),
            Step::RemoveHosts => self.remove_hosts(),
        }
    }
}
