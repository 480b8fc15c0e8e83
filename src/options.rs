//! Option resolution: turning a tokenized command line into a typed,
//! validated [`Options`] record before any planning begins. Grounded on the
//! teacher's `ProjectBuilder` pattern (accumulate fields, then a single
//! fallible `build()`/`validate()` step) generalized to the bespoke
//! joined/separate/joined-equals flag grammar this driver's CLI actually
//! uses.

use crate::error::{DiagnosticEngine, DriverError, Result};
use std::{collections::BTreeMap, path::PathBuf};

/// What kind of driver invocation this is, dispatched from the program
/// basename or an explicit `--driver-mode=<kind>` first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Interactive,
    Batch,
    Frontend,
    ModuleWrap,
    AutolinkExtract,
    Indent,
}

impl DriverKind {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "interactive" | "repl" => Self::Interactive,
            "batch" | "swiftc" => Self::Batch,
            "frontend" => Self::Frontend,
            "moduleWrap" | "module-wrap" => Self::ModuleWrap,
            "autolink-extract" => Self::AutolinkExtract,
            "indent" => Self::Indent,
            _ => return None,
        })
    }
}

/// Dispatches on the program basename and an optional leading
/// `--driver-mode=<kind>` argument.
pub fn determine_driver_kind(argv: &[String]) -> Result<DriverKind> {
    if let Some(first) = argv.first() {
        if let Some(mode) = first.strip_prefix("--driver-mode=") {
            return DriverKind::from_str(mode)
                .ok_or_else(|| DriverError::UnknownDriverMode(mode.to_string()));
        }
    }

    let basename = argv
        .first()
        .map(|s| PathBuf::from(s))
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    Ok(DriverKind::from_str(&basename).unwrap_or(DriverKind::Batch))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigesterMode {
    Api,
    Abi,
}

impl std::str::FromStr for DigesterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "api" => Ok(Self::Api),
            "abi" => Ok(Self::Abi),
            other => Err(other.to_string()),
        }
    }
}

/// The fully parsed, not-yet-validated set of recognized flags. Unrecognized
/// flags are deliberately absent here: full option-table parsing is a
/// surrounding concern this core does not own, but every flag this core's
/// algorithms depend on is represented precisely.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub inputs: Vec<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    pub framework_paths: Vec<PathBuf>,
    pub sdk: Option<PathBuf>,
    pub working_directory: Option<PathBuf>,
    pub output_file_map: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub save_temps: bool,
    pub filelist_threshold: Option<usize>,

    pub emit_module: bool,
    pub emit_module_path: Option<PathBuf>,
    pub emit_module_interface: bool,
    pub emit_module_interface_path: Option<PathBuf>,
    pub emit_private_module_interface_path: Option<PathBuf>,
    pub enable_library_evolution: bool,
    pub explicit_module_build: bool,
    pub verify_emitted_module_interface: bool,

    pub emit_api_baseline: bool,
    pub emit_api_baseline_path: Option<PathBuf>,
    pub emit_abi_baseline: bool,
    pub emit_abi_baseline_path: Option<PathBuf>,
    pub emit_digester_baseline: bool,
    pub emit_digester_baseline_path: Option<PathBuf>,
    pub digester_mode: Option<String>,
    pub compare_to_baseline_path: Option<PathBuf>,
    pub serialize_breaking_changes_path: Option<PathBuf>,
    pub digester_breakage_allowlist_path: Option<PathBuf>,

    pub cache_compile_job: bool,
    pub cas_path: Option<PathBuf>,

    pub whole_module_optimization: bool,
    pub enable_batch_mode: bool,
    pub driver_batch_count: Option<usize>,

    pub parseable_output: bool,
    pub use_frontend_parseable_output: bool,

    pub import_objc_header: Option<PathBuf>,
    pub pch_output_dir: Option<PathBuf>,

    /// Arguments following a `--` terminator, passed through verbatim.
    pub trailing: Vec<String>,
}

/// Parses `args` into an [`Options`] record. Recognizes joined, separate,
/// joined-equals flags, and a terminating `--` after which everything is
/// passed through verbatim.
pub fn parse(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            options.trailing.extend(iter.by_ref().cloned());
            break;
        }

        if let Some(rest) = arg.strip_prefix("-I") {
            let value = if let Some(v) = rest.strip_prefix('=') {
                v.to_string()
            } else if !rest.is_empty() {
                rest.to_string()
            } else {
                iter.next()
                    .cloned()
                    .ok_or_else(|| DriverError::msg("missing value for '-I'"))?
            };
            options.search_paths.push(PathBuf::from(value));
            continue;
        }

        if let Some(rest) = arg.strip_prefix("-F") {
            let value = if let Some(v) = rest.strip_prefix('=') {
                v.to_string()
            } else if !rest.is_empty() {
                rest.to_string()
            } else {
                iter.next()
                    .cloned()
                    .ok_or_else(|| DriverError::msg("missing value for '-F'"))?
            };
            options.framework_paths.push(PathBuf::from(value));
            continue;
        }

        match arg.as_str() {
            "-sdk" => {
                options.sdk =
                    Some(PathBuf::from(iter.next().cloned().ok_or_else(|| {
                        DriverError::msg("missing value for '-sdk'")
                    })?))
            }
            "-working-directory" => {
                options.working_directory = Some(PathBuf::from(
                    iter.next()
                        .cloned()
                        .ok_or_else(|| DriverError::msg("missing value for '-working-directory'"))?,
                ))
            }
            "-output-file-map" => {
                options.output_file_map = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-output-file-map'"),
                )?))
            }
            "-o" => {
                options.output = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-o'"))?,
                ))
            }
            "-save-temps" => options.save_temps = true,
            "-driver-filelist-threshold" => {
                let v = iter
                    .next()
                    .ok_or_else(|| DriverError::msg("missing value for '-driver-filelist-threshold'"))?;
                options.filelist_threshold =
                    Some(v.parse().map_err(|_| DriverError::msg("invalid integer for '-driver-filelist-threshold'"))?);
            }
            "-emit-module" => options.emit_module = true,
            "-emit-module-path" => {
                options.emit_module_path = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-emit-module-path'"))?,
                ))
            }
            "-emit-module-interface" => options.emit_module_interface = true,
            "-emit-module-interface-path" => {
                options.emit_module_interface_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-emit-module-interface-path'"),
                )?))
            }
            "-emit-private-module-interface-path" => {
                options.emit_private_module_interface_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-emit-private-module-interface-path'"),
                )?))
            }
            "-enable-library-evolution" => options.enable_library_evolution = true,
            "-explicit-module-build" => options.explicit_module_build = true,
            "-verify-emitted-module-interface" => options.verify_emitted_module_interface = true,

            "-emit-api-baseline" => options.emit_api_baseline = true,
            "-emit-api-baseline-path" => {
                options.emit_api_baseline_path = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-emit-api-baseline-path'"))?,
                ))
            }
            "-emit-abi-baseline" => options.emit_abi_baseline = true,
            "-emit-abi-baseline-path" => {
                options.emit_abi_baseline_path = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-emit-abi-baseline-path'"))?,
                ))
            }
            "-emit-digester-baseline" => options.emit_digester_baseline = true,
            "-emit-digester-baseline-path" => {
                options.emit_digester_baseline_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-emit-digester-baseline-path'"),
                )?))
            }
            "-digester-mode" => {
                options.digester_mode = Some(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-digester-mode'"))?,
                )
            }
            "-compare-to-baseline-path" => {
                options.compare_to_baseline_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-compare-to-baseline-path'"),
                )?))
            }
            "-serialize-breaking-changes-path" => {
                options.serialize_breaking_changes_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-serialize-breaking-changes-path'"),
                )?))
            }
            "-digester-breakage-allowlist-path" => {
                options.digester_breakage_allowlist_path = Some(PathBuf::from(iter.next().cloned().ok_or_else(
                    || DriverError::msg("missing value for '-digester-breakage-allowlist-path'"),
                )?))
            }

            "-cache-compile-job" => options.cache_compile_job = true,
            "-cas-path" => {
                options.cas_path = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-cas-path'"))?,
                ))
            }

            "-wmo" | "-whole-module-optimization" => options.whole_module_optimization = true,
            "-enable-batch-mode" => options.enable_batch_mode = true,
            "-driver-batch-count" => {
                let v = iter
                    .next()
                    .ok_or_else(|| DriverError::msg("missing value for '-driver-batch-count'"))?;
                options.driver_batch_count =
                    Some(v.parse().map_err(|_| DriverError::msg("invalid integer for '-driver-batch-count'"))?);
            }

            "-parseable-output" => options.parseable_output = true,
            "-use-frontend-parseable-output" => options.use_frontend_parseable_output = true,

            "-import-objc-header" => {
                options.import_objc_header = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-import-objc-header'"))?,
                ))
            }
            "-pch-output-dir" => {
                options.pch_output_dir = Some(PathBuf::from(
                    iter.next().cloned().ok_or_else(|| DriverError::msg("missing value for '-pch-output-dir'"))?,
                ))
            }

            other if !other.starts_with('-') => {
                options.inputs.push(PathBuf::from(other));
            }
            other => {
                return Err(DriverError::msg(format!("unknown option '{other}'")));
            }
        }
    }

    Ok(options)
}

/// Enforces the cross-option validation rules; each violation is a distinct
/// diagnostic, all accumulated before returning.
pub fn validate(options: &Options) -> Result<()> {
    let mut diagnostics = DiagnosticEngine::new();

    let emits_module = options.emit_module || options.emit_module_path.is_some();

    if (options.emit_api_baseline || options.emit_api_baseline_path.is_some()) && !emits_module {
        diagnostics.error(
            "generating a baseline with '-emit-api-baseline' is only supported with '-emit-module' or '-emit-module-path'",
        );
    }
    if (options.emit_abi_baseline || options.emit_abi_baseline_path.is_some()) && !emits_module {
        diagnostics.error(
            "generating a baseline with '-emit-abi-baseline' is only supported with '-emit-module' or '-emit-module-path'",
        );
    }

    if let Some(mode) = &options.digester_mode {
        match mode.parse::<DigesterMode>() {
            Ok(DigesterMode::Abi) => {
                if !options.enable_library_evolution {
                    diagnostics.error(
                        "'-digester-mode abi' cannot be specified if '-enable-library-evolution' is not present",
                    );
                }
                if !options.emit_module_interface {
                    diagnostics.error(
                        "'-digester-mode abi' cannot be specified if '-emit-module-interface' is not present",
                    );
                }
            }
            Ok(DigesterMode::Api) => {}
            Err(bad) => {
                diagnostics.error(format!("invalid value '{bad}' in '-digester-mode'"));
            }
        }
    }

    if options.serialize_breaking_changes_path.is_some() && options.compare_to_baseline_path.is_none() {
        diagnostics.error(
            "'-serialize-breaking-changes-path' cannot be specified if '-compare-to-baseline-path' is not present",
        );
    }

    if options.parseable_output && options.use_frontend_parseable_output {
        diagnostics.error("'-parseable-output' conflicts with '-use-frontend-parseable-output'");
    }

    diagnostics.into_result(())
}

/// The output-file-map: source path (or the empty string for whole-module
/// entries) to a map of product name to output path.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OutputFileMap(pub BTreeMap<String, BTreeMap<String, PathBuf>>);

impl OutputFileMap {
    pub fn load(path: &PathBuf) -> Result<Self> {
        crate::utils::read_json_file(path)
    }

    pub fn entry(&self, source: &str, product: &str) -> Option<&PathBuf> {
        self.0.get(source).and_then(|products| products.get(product))
    }
}
