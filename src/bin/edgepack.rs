use std::cmp::Ordering;
use std::fs;
use std::str::FromStr;

use clap::Parser;

use edgepack::cli::{Cli, ManifestOpt, Opt, PolicyOpt, RegistryOpt, SemverFlags, SemverOpt};
use edgepack::config::Config;
use edgepack::manifest::{
    parse_package_json, resolve_entry, ModuleType, ResolveOptions, ValidateOptions,
};
use edgepack::policy::{PackageMetadata, Preset, SecurityPolicy};
use edgepack::registry::{encode_package_name, validate_namespace, validate_package_name_for_registry};
use edgepack::semver::{self, engine, Options, Release, Version};
use edgepack::edgepack_log;
use edgepack::errors::{bail, console, format_err, report_issue, Result, Tone};

#[test]
fn verify_app() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}

fn options(flags: &SemverFlags) -> Options {
    Options {
        loose: flags.loose,
        include_prerelease: flags.include_prerelease,
    }
}

fn semver_main(opt: SemverOpt) -> Result<()> {
    use SemverOpt::*;
    match opt {
        Valid { input, flags } => match semver::valid(&input, options(&flags)) {
            Some(canonical) => println!("{}", canonical),
            None => bail!("invalid version '{}'", input),
        },
        Clean { input } => match semver::clean(&input) {
            Some(canonical) => println!("{}", canonical),
            None => bail!("cannot clean '{}'", input),
        },
        Coerce { input } => match semver::coerce(&input) {
            Some(version) => println!("{}", version),
            None => bail!("no version found in '{}'", input),
        },
        Compare { a, b } => {
            let a = Version::parse(&a, Options::default())?;
            let b = Version::parse(&b, Options::default())?;
            let shown = match a.compare(&b) {
                Ordering::Less => "-1",
                Ordering::Equal => "0",
                Ordering::Greater => "1",
            };
            println!("{}", shown);
        }
        Diff { a, b } => {
            let a = Version::parse(&a, Options::default())?;
            let b = Version::parse(&b, Options::default())?;
            match semver::diff(&a, &b) {
                Some(release) => println!("{}", release),
                None => println!("equal"),
            }
        }
        Inc {
            version,
            release,
            preid,
            base,
        } => {
            let version = Version::parse(&version, Options::default())?;
            let release =
                Release::from_str(&release).map_err(|e| format_err!("{}", e))?;
            println!(
                "{}",
                version.inc(release, preid.as_deref(), base.as_deref())
            );
        }
        Satisfies {
            version,
            range,
            flags,
        } => {
            let satisfied = engine::satisfies(&version, &range, options(&flags));
            println!("{}", satisfied);
            if !satisfied {
                std::process::exit(1);
            }
        }
        MaxSatisfying {
            range,
            versions,
            flags,
        } => {
            let found = engine::max_satisfying(
                versions.iter().map(String::as_str),
                &range,
                options(&flags),
            );
            match found {
                Some(version) => println!("{}", version),
                None => bail!("no version satisfies '{}'", range),
            }
        }
        ValidRange { range, flags } => match engine::valid_range(&range, options(&flags)) {
            Some(normalized) => println!("{}", normalized),
            None => bail!("invalid range '{}'", range),
        },
    }
    Ok(())
}

fn manifest_main(opt: ManifestOpt) -> Result<()> {
    use ManifestOpt::*;
    match opt {
        Validate {
            path,
            relax_private,
        } => {
            log::info!("validating manifest at {}", path.display());
            let text = fs::read_to_string(&path)?;
            let result = parse_package_json(&text, ValidateOptions { relax_private });
            for warning in &result.warnings {
                report_issue(warning, false);
            }
            for error in &result.errors {
                report_issue(error, true);
            }
            if result.valid {
                edgepack_log!(Tone::Success, "{} is valid", path.display());
            } else {
                bail!(
                    "{} failed validation with {} error(s)",
                    path.display(),
                    result.errors.len()
                );
            }
        }
        Entry {
            path,
            module_type,
            subpath,
            conditions,
        } => {
            let text = fs::read_to_string(&path)?;
            let result = parse_package_json(&text, ValidateOptions::default());
            let Some(manifest) = result.parsed else {
                bail!("{} failed validation", path.display());
            };
            let Some(module_type) = ModuleType::from_field(&module_type) else {
                bail!("unknown module type '{}'", module_type);
            };
            let condition_refs: Vec<&str> = conditions.iter().map(String::as_str).collect();
            let mut opts = ResolveOptions::new(module_type);
            opts.subpath = &subpath;
            opts.conditions = &condition_refs;
            let resolved = resolve_entry(&manifest, &opts);
            match resolved.entry {
                Some(entry) => println!("{}", entry),
                None if resolved.restricted => {
                    bail!("subpath '{}' is restricted", subpath)
                }
                None => bail!("no entry for subpath '{}'", subpath),
            }
        }
    }
    Ok(())
}

fn policy_main(opt: PolicyOpt) -> Result<()> {
    let PolicyOpt::Check {
        packages,
        preset,
        config,
        license,
        size,
    } = opt;
    let policy = match config {
        Some(path) => Config::parse(&path)?.security_policy()?,
        None => SecurityPolicy::preset(
            Preset::from_str(&preset).map_err(|e| format_err!("{}", e))?,
        ),
    };
    let metadata = PackageMetadata {
        license,
        vulnerabilities: Vec::new(),
        size,
    };
    let mut denied = 0usize;
    for package in &packages {
        let result = policy.check_all(package, &metadata);
        if result.allowed {
            edgepack_log!(Tone::Success, "{}: allowed", package);
        } else {
            denied += 1;
            for violation in &result.violations {
                console(Tone::Failure, format!("{}: {}", package, violation.message));
            }
        }
    }
    if denied > 0 {
        bail!("{} of {} package(s) denied", denied, packages.len());
    }
    Ok(())
}

fn registry_main(opt: RegistryOpt) -> Result<()> {
    use RegistryOpt::*;
    match opt {
        Encode { name } => println!("{}", encode_package_name(&name)?),
        Validate { name } => {
            let info = validate_package_name_for_registry(&name);
            match info.error {
                Some(error) => bail!("'{}' is invalid: {}", name, error),
                None => {
                    if info.scoped {
                        println!(
                            "scoped: scope={} name={}",
                            info.scope.unwrap_or_default(),
                            info.name.unwrap_or_default()
                        );
                    } else {
                        println!("unscoped");
                    }
                    if !validate_namespace(&name) {
                        edgepack_log!(Tone::Notice, "'{}' is not usable as a namespace segment", name);
                    }
                }
            }
        }
    }
    Ok(())
}

fn real_main() -> Result<()> {
    let m = Cli::parse();
    use Opt::*;
    match m.command {
        Semver(opt) => semver_main(opt),
        Manifest(opt) => manifest_main(opt),
        Policy(opt) => policy_main(opt),
        Registry(opt) => registry_main(opt),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = real_main() {
        console(Tone::Failure, format!("edgepack failed: {:?}", e));
        std::process::exit(1);
    }
}
