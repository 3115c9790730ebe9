//! Shell pipelines run on the hypervisor host
//!
//! Every pipeline can be overridden from the `[commands]` table of the
//! configuration file; unset entries keep these defaults.

use serde::{Deserialize, Serialize};

/// `Effective Minimum` of the hostd resource group
pub const MEMORY_USAGE_COMMAND: &str = concat!(
    "esxcfg-resgrp -l host/vim/vmvisor/hostd",
    " | grep -E \"Group Name|Effective Minimum\"",
    " | grep -E \"hostd.[0-9]+\" -A 2",
    " | grep -o -E \"[0-9]+\\.[0-9]* MB\"",
);

/// `Total Memory` under the hostd group capacity
pub const MEMORY_LIMIT_COMMAND: &str = concat!(
    "esxcfg-resgrp -l host/vim/vmvisor/hostd",
    " | grep \"Group Capacity\" -A 4",
    " | grep \"Total Memory\"",
    " | head -n 1",
    " | grep -o -E \"[0-9]+\\.[0-9]* MB\"",
);

/// `busy_long` worker count from the latest `HandleWork` log line
pub const THREAD_USAGE_COMMAND: &str = concat!(
    "grep \"HandleWork(type:\" /var/log/hostd.log",
    " | tail -n 1",
    " | grep -o -E \"busy_long:[0-9]+\"",
    " | grep -o -E \"[0-9]+\"",
);

/// Configured `<TaskMax>` of the hostd thread pool
pub const THREAD_LIMIT_COMMAND: &str =
    "grep \"<TaskMax>\" /etc/vmware/hostd/config.xml | grep -o -E \"[0-9]+\"";

/// Open descriptors held by hostd worker threads
pub const FD_USAGE_COMMAND: &str = "vmkvsitools lsof | grep hostd-worker | wc -l";

/// `<hostdMinFds>` plus two descriptors per supported VM
pub const FD_LIMIT_COMMAND: &str = concat!(
    "Base=$(grep \"<hostdMinFds>\" /etc/vmware/hostd/config.xml | grep -o -E \"[0-9]+\"); ",
    "SupportedVMs=$(vsish -e get /system/supportedVMs); ",
    "expr $Base + $SupportedVMs \\* 2",
);

/// Watchdog marker for an unresponsive hostd
pub const RESPONSIVENESS_COMMAND: &str =
    "grep \"hostd detected to be non-responsive\" /var/log/hostd-probe.log";

/// The seven probe pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeCommands {
    /// Memory usage (MB)
    pub memory_usage: String,
    /// Memory limit (MB)
    pub memory_limit: String,
    /// Busy worker threads
    pub thread_usage: String,
    /// Thread pool size
    pub thread_limit: String,
    /// Open descriptors
    pub fd_usage: String,
    /// Descriptor limit
    pub fd_limit: String,
    /// Non-responsiveness marker search
    pub responsiveness: String,
}

impl Default for ProbeCommands {
    fn default() -> Self {
        Self {
            memory_usage: MEMORY_USAGE_COMMAND.to_string(),
            memory_limit: MEMORY_LIMIT_COMMAND.to_string(),
            thread_usage: THREAD_USAGE_COMMAND.to_string(),
            thread_limit: THREAD_LIMIT_COMMAND.to_string(),
            fd_usage: FD_USAGE_COMMAND.to_string(),
            fd_limit: FD_LIMIT_COMMAND.to_string(),
            responsiveness: RESPONSIVENESS_COMMAND.to_string(),
        }
    }
}
