use clap::{builder::styling::AnsiColor, builder::Styles, Args, Parser, Subcommand};

const CLI_STYLE: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Debug, Clone, Parser)]
#[command(name = "edgepack", about = "Package-manager toolkit for sandboxed JavaScript runtimes")]
#[command(version)]
#[command(styles = CLI_STYLE)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Opt,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Opt {
    /// Semantic-version operations
    #[command(subcommand, alias = "sv")]
    Semver(SemverOpt),
    /// Package-manifest operations
    #[command(subcommand, alias = "m")]
    Manifest(ManifestOpt),
    /// Security-policy checks
    #[command(subcommand, alias = "p")]
    Policy(PolicyOpt),
    /// Registry naming helpers
    #[command(subcommand, alias = "r")]
    Registry(RegistryOpt),
}

#[derive(Debug, Clone, Args)]
pub struct SemverFlags {
    /// Tolerate loose input (leading v/=, leading zeros)
    #[arg(long)]
    pub loose: bool,

    /// Let prereleases match ranges that do not mention them
    #[arg(long = "include-prerelease")]
    pub include_prerelease: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SemverOpt {
    /// Print the canonical form of a version, if it parses
    Valid {
        #[arg(value_name = "VERSION")]
        input: String,

        #[command(flatten)]
        flags: SemverFlags,
    },
    /// Strip wrapping noise and print the canonical version
    Clean {
        #[arg(value_name = "INPUT")]
        input: String,
    },
    /// Pull a version out of arbitrary text
    Coerce {
        #[arg(value_name = "INPUT")]
        input: String,
    },
    /// Compare two versions (-1, 0, 1)
    #[command(alias = "cmp")]
    Compare {
        #[arg(value_name = "A")]
        a: String,
        #[arg(value_name = "B")]
        b: String,
    },
    /// Name the release level separating two versions
    Diff {
        #[arg(value_name = "A")]
        a: String,
        #[arg(value_name = "B")]
        b: String,
    },
    /// Bump a version
    Inc {
        #[arg(value_name = "VERSION")]
        version: String,

        /// major, minor, patch, premajor, preminor, prepatch or prerelease
        #[arg(value_name = "RELEASE")]
        release: String,

        /// Prerelease identifier, e.g. beta
        #[arg(long)]
        preid: Option<String>,

        /// Starting number for the prerelease identifier
        #[arg(long)]
        base: Option<String>,
    },
    /// Test a version against a range
    #[command(alias = "sat")]
    Satisfies {
        #[arg(value_name = "VERSION")]
        version: String,
        #[arg(value_name = "RANGE")]
        range: String,

        #[command(flatten)]
        flags: SemverFlags,
    },
    /// Pick the greatest version satisfying a range
    #[command(name = "max-satisfying", alias = "max")]
    MaxSatisfying {
        #[arg(value_name = "RANGE")]
        range: String,

        #[arg(value_name = "VERSIONS", required = true)]
        versions: Vec<String>,

        #[command(flatten)]
        flags: SemverFlags,
    },
    /// Normalize a range string
    #[command(name = "valid-range")]
    ValidRange {
        #[arg(value_name = "RANGE")]
        range: String,

        #[command(flatten)]
        flags: SemverFlags,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ManifestOpt {
    /// Validate a package.json document
    Validate {
        /// Path to package.json
        #[arg(value_name = "PATH")]
        path: std::path::PathBuf,

        /// Skip name/version strictness for private manifests
        #[arg(long = "relax-private")]
        relax_private: bool,
    },
    /// Resolve the entry point of a manifest
    Entry {
        /// Path to package.json
        #[arg(value_name = "PATH")]
        path: std::path::PathBuf,

        /// module or commonjs
        #[arg(long = "module-type", default_value = "commonjs")]
        module_type: String,

        /// Subpath to resolve
        #[arg(long, default_value = ".")]
        subpath: String,

        /// Conditions to honor, in order
        #[arg(long, value_delimiter = ',')]
        conditions: Vec<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum PolicyOpt {
    /// Check package names against a policy
    Check {
        #[arg(value_name = "PACKAGE", required = true)]
        packages: Vec<String>,

        /// restricted, standard or permissive
        #[arg(long, default_value = "standard")]
        preset: String,

        /// Path to an edgepack.toml overriding the preset
        #[arg(short, long, value_name = "FILE")]
        config: Option<std::path::PathBuf>,

        /// License to check alongside the name
        #[arg(long)]
        license: Option<String>,

        /// Package size in bytes to check alongside the name
        #[arg(long)]
        size: Option<u64>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RegistryOpt {
    /// URL-encode a package name for registry paths
    Encode {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Validate a name's registry shape and namespace fitness
    Validate {
        #[arg(value_name = "NAME")]
        name: String,
    },
}
