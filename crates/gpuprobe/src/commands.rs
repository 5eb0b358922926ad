use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use gpulease::backend::{get_or_create_root, RootCache};
use gpulease::{GpuLease, WgpuLeases, WgpuPlatform};
use leaseconfig::LeaseConfig;
use tracing::{debug, info};

use crate::bindings;
use crate::cli::{ConfigCheckArgs, ConfigInitArgs, ProbeArgs, ShareArgs};
use crate::paths::AppPaths;
use crate::report::{describe_policy, AdapterReport, ProbeReport, StatsReport};

fn build_manager(config: &LeaseConfig) -> WgpuLeases {
    let platform = WgpuPlatform::probe(bindings::wgpu_options(&config.device));
    WgpuLeases::with_policy(platform, bindings::teardown_policy(&config.teardown))
}

pub fn probe(config: &LeaseConfig, args: &ProbeArgs) -> Result<()> {
    let manager = build_manager(config);

    let mut report = ProbeReport {
        supported: manager.is_supported(),
        reason: None,
        adapter: None,
        teardown: describe_policy(manager.policy()),
        stats: StatsReport::default(),
    };

    if report.supported {
        match pollster::block_on(manager.acquire()) {
            Some(lease) => {
                report.adapter = Some(AdapterReport::from(lease.device().profile()));
                lease.release();
            }
            None => {
                report.reason = Some("device creation failed; see log for details".to_string());
            }
        }
    } else {
        report.reason = Some(manager.unsupported_reason());
    }

    manager.destroy();
    report.stats = manager.stats().into();

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{json}");
    } else {
        println!("{report}");
    }
    Ok(())
}

pub fn share(config: &LeaseConfig, args: &ShareArgs) -> Result<()> {
    let manager = build_manager(config);
    if !manager.is_supported() {
        bail!("GPU unavailable: {}", manager.unsupported_reason());
    }

    let roots = RootCache::new();
    for round in 1..=args.rounds {
        let created_before = manager.stats().devices_created;
        let leases: Vec<GpuLease<WgpuPlatform>> =
            pollster::block_on(join_all((0..args.consumers).map(|_| manager.acquire())))
                .into_iter()
                .flatten()
                .collect();

        let Some(first) = leases.first() else {
            bail!("round {round}: no consumer received a device");
        };
        if leases.len() != args.consumers {
            bail!(
                "round {round}: only {} of {} consumers received a device",
                leases.len(),
                args.consumers
            );
        }
        if !leases.iter().all(|lease| lease.shares_device_with(first)) {
            bail!("round {round}: consumers received different devices");
        }

        let created = manager.stats().devices_created - created_before;
        if created > 1 {
            bail!("round {round}: {created} devices were created for one round");
        }

        let root = get_or_create_root(&roots, first.device());
        for lease in &leases {
            let other = get_or_create_root(&roots, lease.device());
            if !Arc::ptr_eq(&root, &other) {
                bail!("round {round}: derived contexts differ for one device");
            }
        }
        let encoder = root.command_encoder("share check");
        root.submit(encoder);

        info!(
            round,
            consumers = leases.len(),
            handle = %first.id(),
            share_count = manager.share_count(),
            reused = created == 0,
            "consumers share one device"
        );
        drop(leases);
        debug!(round, status = ?manager.status(), "released all leases");
    }

    manager.destroy();
    let purged = roots.purge();
    debug!(purged, "purged derived contexts");

    let stats = StatsReport::from(manager.stats());
    println!(
        "{} round(s) of {} consumer(s): {stats}",
        args.rounds, args.consumers
    );
    Ok(())
}

pub fn config_check(paths: &AppPaths, explicit: Option<&Path>, args: &ConfigCheckArgs) -> Result<()> {
    let default_path = paths.config_file();
    let path = args
        .path
        .as_deref()
        .or(explicit)
        .unwrap_or(default_path.as_path());

    let config = LeaseConfig::load(path)
        .with_context(|| format!("configuration at {} is invalid", path.display()))?;

    let options = bindings::wgpu_options(&config.device);
    let surface = bindings::surface_options(&config.surface);
    println!("{}: ok", path.display());
    println!("device: {} ({:?})", options.label, options.backends);
    println!(
        "teardown: {}",
        describe_policy(bindings::teardown_policy(&config.teardown))
    );
    println!(
        "surface: alpha {:?}, prefer sRGB {}",
        surface.alpha_mode, surface.prefer_srgb
    );
    Ok(())
}

pub fn config_init(paths: &AppPaths, args: &ConfigInitArgs) -> Result<()> {
    ensure_directory(paths.config_dir())?;

    let path = paths.config_file();
    if path.exists() && !args.force {
        bail!(
            "configuration already exists at {}; pass --force to overwrite",
            path.display()
        );
    }

    let contents = LeaseConfig::default().to_toml_string()?;
    fs::write(&path, contents)
        .with_context(|| format!("failed to write configuration at {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    println!("{}", path.display());
    Ok(())
}

pub fn print_where(paths: &AppPaths) {
    println!("config dir:  {}", paths.config_dir().display());
    let file = paths.config_file();
    let state = if file.exists() { "" } else { " (missing, defaults apply)" };
    println!("config file: {}{state}", file.display());
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if path.is_dir() {
            debug!(path = %path.display(), "reusing existing directory");
            Ok(())
        } else {
            bail!("filesystem entry at {} is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory at {}", path.display()))?;
        info!(path = %path.display(), "created config directory");
        Ok(())
    }
}
