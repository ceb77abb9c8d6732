//! One-time plugin bootstrap.

use crate::bridge::HostBridge;
use crate::thunks::{self, RUNTIME, Runtime};
use crate::{Error, HookSite, Result, logging};
use hooks::{DEFAULT_TRAMPOLINE_SIZE, HookManager, PatchWriter};
use policy::{DEFAULT_POLICY_FILE, Policy, PolicySource};
use std::path::{Path, PathBuf};

pub const PLUGIN_NAME: &str = "InvLocker";

/// Where the plugin reads its flags and writes its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub config_path: PathBuf,
    /// `None` leaves logging to whoever already installed a subscriber.
    pub log_dir: Option<PathBuf>,
    pub trampoline_size: usize,
}

impl LoadOptions {
    /// Flag file and log both in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            config_path: dir.join(DEFAULT_POLICY_FILE),
            log_dir: Some(dir.to_path_buf()),
            trampoline_size: DEFAULT_TRAMPOLINE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Installed,
    /// Not wanted under the loaded policy.
    Skipped,
    Failed(String),
}

impl std::fmt::Display for HookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => f.write_str("installed"),
            Self::Skipped => f.write_str("skipped"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// What [`load`] managed to set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub policy: Policy,
    /// `None` when the flag file was unusable and defaults were applied.
    pub policy_source: Option<PolicySource>,
    pub log_file: Option<PathBuf>,
    /// Why the log file could not be started, if it could not.
    pub log_error: Option<String>,
    pub hooks: Vec<(HookSite, HookStatus)>,
}

impl LoadReport {
    pub fn status(&self, site: HookSite) -> Option<&HookStatus> {
        self.hooks.iter().find(|(s, _)| *s == site).map(|(_, status)| status)
    }

    pub fn installed(&self) -> usize {
        self.hooks
            .iter()
            .filter(|(_, status)| *status == HookStatus::Installed)
            .count()
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{PLUGIN_NAME}: {} of {} hooks installed", self.installed(), self.hooks.len())?;
        for (site, status) in &self.hooks {
            writeln!(f, "  {site:<20} {status}")?;
        }
        if let Some(e) = &self.log_error {
            writeln!(f, "  log not started: {e}")?;
        }
        Ok(())
    }
}

/// Load the flag file, start logging and install every hook.
///
/// Hook failures do not fail the load; the affected operation simply stays
/// unprotected and the failure is logged and reported.
pub fn load(bridge: Box<dyn HostBridge>, options: &LoadOptions) -> Result<LoadReport> {
    load_with(&mut HookManager::new(), bridge, options)
}

pub(crate) fn load_with<W: PatchWriter>(
    manager: &mut HookManager<W>,
    bridge: Box<dyn HostBridge>,
    options: &LoadOptions,
) -> Result<LoadReport> {
    if RUNTIME.get().is_some() {
        return Err(Error::AlreadyLoaded);
    }

    let (policy, policy_source, policy_error) = match Policy::load_or_create(&options.config_path) {
        Ok((policy, source)) => (policy, Some(source), None),
        Err(e) => (Policy::default(), None, Some(e)),
    };
    let (log_file, log_error) = start_logging(options, policy.debugging);

    tracing::info!(plugin = PLUGIN_NAME, version = env!("CARGO_PKG_VERSION"), "loading");
    if let Some(e) = policy_error {
        tracing::warn!(
            path = %options.config_path.display(),
            error = %e,
            "unusable flag file, using defaults"
        );
    }
    tracing::info!("effective policy:\n{policy}");
    if !policy.item_locks_enabled() {
        tracing::warn!("equipped and favorite locks are both off, nothing is protected");
    }

    RUNTIME
        .set(Runtime { policy, bridge })
        .map_err(|_| Error::AlreadyLoaded)?;
    let Some(runtime) = RUNTIME.get() else {
        return Err(Error::AlreadyLoaded);
    };
    let bridge = runtime.bridge.as_ref();

    let mut hooks = Vec::with_capacity(HookSite::ALL.len());
    for site in [HookSite::ContainerTransfer, HookSite::BarterTransfer, HookSite::ScrapAccept] {
        let result = bridge
            .dispatch_table(site)
            .ok_or(Error::MissingTable(site))
            // SAFETY: the bridge hands out the host's own table for `site`.
            .and_then(|table| unsafe { thunks::install_slot(manager, site, table) });
        hooks.push((site, status(site, result)));
    }

    let take_all = if policy.lock_take_all {
        status(HookSite::TakeAll, install_take_all(manager, bridge, options))
    } else {
        HookStatus::Skipped
    };
    hooks.push((HookSite::TakeAll, take_all));

    let report = LoadReport {
        policy,
        policy_source,
        log_file,
        log_error,
        hooks,
    };
    tracing::info!(installed = report.installed(), "loaded");
    Ok(report)
}

/// Start the log file, if one is wanted.
///
/// A failure cannot go to a log that does not exist, so it is printed to
/// stderr for the host's console and carried into the report.
fn start_logging(options: &LoadOptions, debugging: bool) -> (Option<PathBuf>, Option<String>) {
    let Some(dir) = options.log_dir.as_deref() else {
        return (None, None);
    };
    match logging::init(dir, debugging) {
        Ok(path) => (Some(path), None),
        Err(e) => {
            eprintln!("{PLUGIN_NAME}: {e}");
            (None, Some(e.to_string()))
        }
    }
}

fn install_take_all<W: PatchWriter>(
    manager: &mut HookManager<W>,
    bridge: &dyn HostBridge,
    options: &LoadOptions,
) -> Result<()> {
    let call_site = bridge
        .take_all_site()
        .ok_or(Error::MissingCallSite(HookSite::TakeAll))?;
    let resolver = bridge.address_resolver().ok_or(Error::MissingAddressLibrary)?;
    let site = call_site.resolve(resolver, bridge.build_discriminator())?;
    manager.reserve_trampoline(options.trampoline_size, bridge.module_base())?;
    // SAFETY: the site was resolved from the address library of the
    // running build.
    unsafe { thunks::install_take_all(manager, site) }
}

fn status(site: HookSite, result: Result<()>) -> HookStatus {
    match result {
        Ok(()) => HookStatus::Installed,
        Err(e) => {
            tracing::warn!(hook = %site, error = %e, "hook not installed, operation unprotected");
            HookStatus::Failed(e.to_string())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        DirectWriter, EQUIPPED, HostCall, PLAIN, TestBridge, host_scrap, host_transfer, receiver,
        take_calls,
    };
    use crate::thunks::{ScrapAcceptFn, TakeAllFn, TransferFn};
    use hooks::{AddressId, AddressTable, CallSite, Trampoline};
    use host::mock::entry;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    const TAKE_ALL_ID: u64 = 0x5150;

    /// Notes how many originals were published at each write.
    struct RecordingWriter(Rc<RefCell<Vec<usize>>>);

    impl PatchWriter for RecordingWriter {
        unsafe fn write(&self, dst: usize, bytes: &[u8]) -> hooks::Result<()> {
            self.0.borrow_mut().push(thunks::published());
            // SAFETY: forwarded caller contract.
            unsafe { DirectWriter.write(dst, bytes) }
        }
    }

    fn leaked_table(slots: usize, f: usize) -> usize {
        Box::leak(vec![f; slots].into_boxed_slice()).as_mut_ptr() as usize
    }

    fn slot(table: usize, index: usize) -> usize {
        // SAFETY: `table` is a leaked test table with more than `index` slots.
        unsafe { *(table as *const usize).add(index) }
    }

    /// 128 leaked bytes: a `call` to the next instruction at offset 0,
    /// room for the trampoline from offset 64.
    fn leaked_code() -> usize {
        let code = Box::leak(vec![0xCCu8; 128].into_boxed_slice());
        code[..5].copy_from_slice(&[0xE8, 0, 0, 0, 0]);
        code.as_mut_ptr() as usize
    }

    #[test]
    fn test_load_installs_hooks_and_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let container = leaked_table(0x16, host_transfer as TransferFn as usize);
        let scrap = leaked_table(2, host_scrap as ScrapAcceptFn as usize);
        let code = leaked_code();
        // No barter table.
        let bridge = TestBridge {
            tables: HashMap::from([
                (HookSite::ContainerTransfer, container),
                (HookSite::ScrapAccept, scrap),
            ]),
            addresses: Some(AddressTable::with_entries(code, [(TAKE_ALL_ID, 0)])),
            take_all_site: Some(CallSite::new(AddressId::new(TAKE_ALL_ID, TAKE_ALL_ID), 0)),
            ..TestBridge::with_items()
        };

        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut manager = HookManager::with_writer(RecordingWriter(Rc::clone(&writes)));
        // SAFETY: the upper half of the leaked code buffer.
        manager.set_trampoline(unsafe { Trampoline::from_raw_parts(code + 64, 64) });
        let report = load_with(&mut manager, Box::new(bridge), &LoadOptions::new(dir.path())).unwrap();

        // Every original was in place before its site was rewritten.
        assert_eq!(*writes.borrow(), vec![1, 2, 3]);

        assert_eq!(report.policy, Policy::default());
        assert_eq!(report.policy_source, Some(PolicySource::Created));
        assert!(dir.path().join(DEFAULT_POLICY_FILE).exists());
        assert_eq!(report.status(HookSite::ContainerTransfer), Some(&HookStatus::Installed));
        assert_eq!(report.status(HookSite::ScrapAccept), Some(&HookStatus::Installed));
        assert_eq!(report.status(HookSite::TakeAll), Some(&HookStatus::Installed));
        assert!(matches!(report.status(HookSite::BarterTransfer), Some(HookStatus::Failed(_))));
        assert_eq!(report.installed(), 3);
        assert!(report.to_string().contains("3 of 4 hooks installed"));

        assert_ne!(slot(container, 0x15), host_transfer as TransferFn as usize);
        assert_eq!(slot(container, 0x14), host_transfer as TransferFn as usize);
        assert_ne!(slot(scrap, 1), host_scrap as ScrapAcceptFn as usize);

        // The call now lands on a stub in the trampoline.
        // SAFETY: `code` is the leaked buffer; the stub lies inside it.
        let (stub, target) = unsafe {
            let disp = std::ptr::read_unaligned((code + 1) as *const i32);
            let stub = code.wrapping_add(5).wrapping_add_signed(disp as isize);
            (stub, std::ptr::read_unaligned((stub + 6) as *const u64) as usize)
        };
        assert!((code + 64..code + 128).contains(&stub));

        // SAFETY: the slots and the stub target are the thunks, which take
        // these signatures.
        let (transfer, accept, take_all) = unsafe {
            (
                std::mem::transmute::<usize, TransferFn>(slot(container, 0x15)),
                std::mem::transmute::<usize, ScrapAcceptFn>(slot(scrap, 1)),
                std::mem::transmute::<usize, TakeAllFn>(target),
            )
        };
        let plain = vec![entry(PLAIN, &[0])];
        let equipped = vec![entry(EQUIPPED, &[0])];
        let both = vec![entry(PLAIN, &[0]), entry(EQUIPPED, &[0])];

        // SAFETY: receivers follow the test bridge's convention.
        unsafe {
            transfer(receiver(&equipped), 0, 1, false);
            transfer(receiver(&plain), 0, 1, false);
            accept(receiver(&equipped));
            accept(receiver(&plain));
            take_all(receiver(&both));
        }
        let moved = |index, from_container| HostCall::Transfer {
            index,
            count: 1,
            from_container,
        };
        assert_eq!(
            take_calls(),
            vec![moved(0, false), HostCall::Scrap, moved(0, true)]
        );

        let err = load_with(&mut manager, Box::new(TestBridge::default()), &LoadOptions::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyLoaded));
        assert_eq!(manager.patched(), 3);
    }

    #[test]
    fn test_report_lists_every_site() {
        let report = LoadReport {
            policy: Policy::default(),
            policy_source: None,
            log_file: None,
            log_error: Some("permission denied".to_string()),
            hooks: vec![
                (HookSite::ContainerTransfer, HookStatus::Installed),
                (HookSite::TakeAll, HookStatus::Skipped),
            ],
        };
        let text = report.to_string();
        assert!(text.contains("1 of 2 hooks installed"));
        assert!(text.contains("take all"));
        assert!(text.contains("skipped"));
        assert!(text.contains("log not started: permission denied"));
        assert_eq!(report.status(HookSite::BarterTransfer), None);
    }

    #[test]
    fn test_logging_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plugins");
        std::fs::write(&not_a_dir, "").unwrap();
        let options = LoadOptions {
            log_dir: Some(not_a_dir),
            ..LoadOptions::new(dir.path())
        };

        let (log_file, log_error) = start_logging(&options, false);
        assert_eq!(log_file, None);
        assert!(log_error.is_some());

        let quiet = LoadOptions {
            log_dir: None,
            ..options
        };
        assert_eq!(start_logging(&quiet, false), (None, None));
    }

    #[test]
    fn test_options_place_files_in_one_dir() {
        let options = LoadOptions::new("/data/F4SE/Plugins");
        assert_eq!(options.config_path, Path::new("/data/F4SE/Plugins").join(DEFAULT_POLICY_FILE));
        assert_eq!(options.log_dir.as_deref(), Some(Path::new("/data/F4SE/Plugins")));
        assert_eq!(options.trampoline_size, DEFAULT_TRAMPOLINE_SIZE);
    }
}
