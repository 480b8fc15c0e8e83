//! The job planner: turns resolved options, inputs, and (when explicit
//! module build is active) the IMDG into a [`JobGraph`]. Planning is a
//! single options+inputs+imdg -> `JobGraph` step, with no I/O of its own.

use crate::{
    error::{DiagnosticEngine, DriverError, Result},
    imdg::{InterModuleDependencyGraph, ModuleDetails, ModuleId},
    job::{ArgTemplate, Job, JobGraph, JobKind},
    options::{DigesterMode, Options, OutputFileMap},
    vpath::{FileType, TypedPath, VirtualPath},
};
use std::path::{Path, PathBuf};

/// The compilation mode the options imply, computed before any job is
/// synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Immediate,
    WholeModule,
    Standard,
}

pub fn compute_mode(kind: crate::options::DriverKind, options: &Options) -> Mode {
    use crate::options::DriverKind;
    match kind {
        DriverKind::Interactive if options.inputs.is_empty() => Mode::Interactive,
        DriverKind::Interactive => Mode::Immediate,
        _ if options.whole_module_optimization => Mode::WholeModule,
        _ => Mode::Standard,
    }
}

/// Derives the output path for one logical product of `input`, honoring
/// this precedence: explicit per-product flag, output-file-map entry,
/// derived from `-o`/the primary input, then a scratch temporary.
fn derive_output(
    input: &Path,
    product_key: &str,
    explicit: Option<&Path>,
    output_file_map: Option<&OutputFileMap>,
    o_flag: Option<&Path>,
    extension: &str,
) -> VirtualPath {
    if let Some(path) = explicit {
        return VirtualPath::absolute(path.to_path_buf());
    }

    if let Some(map) = output_file_map {
        let source_key = input.to_string_lossy().into_owned();
        if let Some(path) = map.entry(&source_key, product_key) {
            return VirtualPath::absolute(path.clone());
        }
    }

    if let Some(o) = o_flag {
        return VirtualPath::relative(o.with_extension(extension.trim_start_matches('.')));
    }

    if let Some(stem) = input.file_stem() {
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(extension.trim_start_matches('.'));
        return VirtualPath::relative(PathBuf::from(name));
    }

    VirtualPath::temporary(format!("out.{}", extension.trim_start_matches('.')))
}

/// Produces the complete job graph for `options`. `imdg` is required only
/// when `options.explicit_module_build` is set.
pub fn plan(
    kind: crate::options::DriverKind,
    options: &Options,
    imdg: Option<&InterModuleDependencyGraph>,
) -> Result<JobGraph> {
    crate::options::validate(options)?;

    let mut diagnostics = DiagnosticEngine::new();
    let mode = compute_mode(kind, options);
    let mut graph = JobGraph::default();

    let output_file_map = match &options.output_file_map {
        Some(path) => Some(OutputFileMap::load(path)?),
        None => None,
    };

    if diagnostics.has_errors() {
        return diagnostics.into_result(graph);
    }

    if matches!(mode, Mode::Interactive) {
        return Ok(graph);
    }

    let compile_outputs = if options.enable_batch_mode && options.inputs.len() > 1 {
        plan_batch_compile_jobs(&mut graph, options, output_file_map.as_ref())
    } else {
        plan_per_file_compile_jobs(&mut graph, options, output_file_map.as_ref())
    };

    if !compile_outputs.is_empty() && matches!(mode, Mode::Standard | Mode::WholeModule) {
        let link_out = options
            .output
            .clone()
            .map(VirtualPath::relative)
            .unwrap_or_else(|| VirtualPath::relative(PathBuf::from("a.out")));

        let mut command_line = vec![ArgTemplate::literal("-o"), ArgTemplate::Path(TypedPath::new(link_out.clone(), FileType::Image))];
        let mut inputs = Vec::new();
        let mut deps = std::collections::BTreeSet::new();
        for (index, object) in &compile_outputs {
            inputs.push(TypedPath::new(object.clone(), FileType::Object));
            command_line.push(ArgTemplate::Path(TypedPath::new(object.clone(), FileType::Object)));
            deps.insert(*index);
        }
        let deps: Vec<usize> = deps.into_iter().collect();
        let primary_count = inputs.len();

        graph.push(
            Job {
                module_name: "main".into(),
                kind: JobKind::Link,
                tool_name: "linker".into(),
                command_line,
                inputs,
                primary_inputs: (0..primary_count).collect(),
                outputs: vec![TypedPath::new(link_out, FileType::Image)],
                requires_in_place_execution: false,
                working_directory: options.working_directory.clone(),
            },
            deps,
        );
    }

    let emits_module = options.emit_module || options.emit_module_path.is_some();

    // `-emit-digester-baseline -digester-mode {api,abi}` is a second way to
    // request the same baseline job as `-emit-{api,abi}-baseline`; `validate()`
    // has already rejected an unparseable `-digester-mode` by this point.
    let digester_mode = options.digester_mode.as_deref().and_then(|m| m.parse::<DigesterMode>().ok());
    let digester_wants_api = options.emit_digester_baseline && digester_mode == Some(DigesterMode::Api);
    let digester_wants_abi = options.emit_digester_baseline && digester_mode == Some(DigesterMode::Abi);

    if (options.emit_api_baseline || options.emit_api_baseline_path.is_some() || digester_wants_api) && emits_module {
        plan_baseline_job(&mut graph, options, output_file_map.as_ref(), false)?;
    }
    if (options.emit_abi_baseline || options.emit_abi_baseline_path.is_some() || digester_wants_abi) && emits_module {
        plan_baseline_job(&mut graph, options, output_file_map.as_ref(), true)?;
    }

    if options.explicit_module_build {
        let imdg = imdg.ok_or_else(|| DriverError::msg("explicit module build requires a scanned IMDG"))?;
        plan_explicit_module_jobs(&mut graph, options, imdg)?;
    }

    Ok(graph)
}

fn module_name_of(input: &Path) -> String {
    input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn object_output_for(input: &Path, output_file_map: Option<&OutputFileMap>) -> VirtualPath {
    match output_file_map.and_then(|map| map.entry(&input.to_string_lossy(), "object")) {
        Some(path) => VirtualPath::absolute(path.clone()),
        None => {
            let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            VirtualPath::temporary(format!("{stem}.o"))
        }
    }
}

/// One compile job per input, each with a single primary. This is the
/// ordinary (non-batch) compile path.
fn plan_per_file_compile_jobs(
    graph: &mut JobGraph,
    options: &Options,
    output_file_map: Option<&OutputFileMap>,
) -> Vec<(usize, VirtualPath)> {
    let mut compile_outputs = Vec::new();

    for input in &options.inputs {
        // The per-file object is an intermediate consumed by the link job;
        // `-o` names the link product, not this one, so unless the
        // output-file-map names it explicitly it is always scratch.
        let object_out = object_output_for(input, output_file_map);
        let compile_index = graph.push(
            Job {
                module_name: module_name_of(input),
                kind: JobKind::Compile,
                tool_name: "frontend".into(),
                command_line: vec![
                    ArgTemplate::literal("-c"),
                    ArgTemplate::Path(TypedPath::new(VirtualPath::relative(input.clone()), FileType::Source)),
                    ArgTemplate::literal("-o"),
                    ArgTemplate::Path(TypedPath::new(object_out.clone(), FileType::Object)),
                ],
                inputs: vec![TypedPath::new(VirtualPath::relative(input.clone()), FileType::Source)],
                primary_inputs: vec![0],
                outputs: vec![TypedPath::new(object_out.clone(), FileType::Object)],
                requires_in_place_execution: false,
                working_directory: options.working_directory.clone(),
            },
            vec![],
        );
        compile_outputs.push((compile_index, object_out));
    }

    compile_outputs
}

/// Splits `n` inputs round-robin across `batch_count` batches, dropping any
/// batch that ends up empty (when `batch_count` exceeds `n`).
fn partition_into_batches(n: usize, batch_count: usize) -> Vec<Vec<usize>> {
    let mut batches = vec![Vec::new(); batch_count.max(1)];
    for i in 0..n {
        batches[i % batch_count.max(1)].push(i);
    }
    batches.retain(|batch| !batch.is_empty());
    batches
}

/// One compile job per batch, each job carrying every file assigned to that
/// batch as a primary (`-primary-file`) and producing one object per
/// primary. `-driver-batch-count` sets the number of batches; absent, all
/// inputs land in a single batch job.
fn plan_batch_compile_jobs(
    graph: &mut JobGraph,
    options: &Options,
    output_file_map: Option<&OutputFileMap>,
) -> Vec<(usize, VirtualPath)> {
    let batch_count = options.driver_batch_count.unwrap_or(1).clamp(1, options.inputs.len());
    let batches = partition_into_batches(options.inputs.len(), batch_count);

    let mut compile_outputs = Vec::new();

    for batch in &batches {
        let mut command_line = vec![ArgTemplate::literal("-c")];
        for &idx in batch {
            command_line.push(ArgTemplate::literal("-primary-file"));
            command_line.push(ArgTemplate::Path(TypedPath::new(
                VirtualPath::relative(options.inputs[idx].clone()),
                FileType::Source,
            )));
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut batch_objects = Vec::new();
        for &idx in batch {
            let input = &options.inputs[idx];
            inputs.push(TypedPath::new(VirtualPath::relative(input.clone()), FileType::Source));

            let object_out = object_output_for(input, output_file_map);
            command_line.push(ArgTemplate::literal("-o"));
            command_line.push(ArgTemplate::Path(TypedPath::new(object_out.clone(), FileType::Object)));
            outputs.push(TypedPath::new(object_out.clone(), FileType::Object));
            batch_objects.push(object_out);
        }

        let module_name = module_name_of(&options.inputs[batch[0]]);
        let primary_inputs: Vec<usize> = (0..batch.len()).collect();

        let compile_index = graph.push(
            Job {
                module_name,
                kind: JobKind::Compile,
                tool_name: "frontend".into(),
                command_line,
                inputs,
                primary_inputs,
                outputs,
                requires_in_place_execution: false,
                working_directory: options.working_directory.clone(),
            },
            vec![],
        );

        for object in batch_objects {
            compile_outputs.push((compile_index, object));
        }
    }

    compile_outputs
}

/// Plans the `generateAPIBaseline`/`generateABIBaseline` job. `abi`
/// selects the ABI variant, which additionally carries a literal `-abi`
/// flag the API variant must not have.
fn plan_baseline_job(
    graph: &mut JobGraph,
    options: &Options,
    output_file_map: Option<&OutputFileMap>,
    abi: bool,
) -> Result<()> {
    let input = options
        .inputs
        .first()
        .ok_or_else(|| DriverError::MissingRequiredInput("baseline generation".into()))?;
    let module = module_name_of(input);

    let explicit_path = if abi {
        options.emit_abi_baseline_path.as_deref().or(options.emit_digester_baseline_path.as_deref())
    } else {
        options.emit_api_baseline_path.as_deref().or(options.emit_digester_baseline_path.as_deref())
    };
    let product_key = if abi { "abi-baseline-json" } else { "api-baseline-json" };
    let extension = if abi { "abi.json" } else { "api.json" };

    let output = derive_output(input, product_key, explicit_path, output_file_map, None, extension);

    let mut command_line = vec![
        ArgTemplate::literal("-dump-sdk"),
        ArgTemplate::literal("-module"),
        ArgTemplate::literal(module),
        ArgTemplate::literal("-I"),
        ArgTemplate::literal("."),
        ArgTemplate::literal("-o"),
        ArgTemplate::Path(TypedPath::new(
            output.clone(),
            if abi { FileType::AbiBaseline } else { FileType::ApiBaseline },
        )),
    ];
    if abi {
        command_line.push(ArgTemplate::literal("-abi"));
    }

    graph.push(
        Job {
            module_name: module_name_of(input),
            kind: if abi { JobKind::GenerateAbiBaseline } else { JobKind::GenerateApiBaseline },
            tool_name: "frontend".into(),
            command_line,
            inputs: vec![TypedPath::new(VirtualPath::relative(input.clone()), FileType::Source)],
            primary_inputs: vec![0],
            outputs: vec![TypedPath::new(
                output,
                if abi { FileType::AbiBaseline } else { FileType::ApiBaseline },
            )],
            requires_in_place_execution: false,
            working_directory: options.working_directory.clone(),
        },
        vec![],
    );
    Ok(())
}

/// Emits one job per non-main module in the IMDG: disables implicit module
/// loading, appends the scanner-provided command line verbatim, threads
/// dependency flags through a fixed-point closure, rejects placeholders
/// anywhere in the closure, and fails with
/// `unsupported-configuration-for-caching` for a prebuilt module that also
/// has a bridging header.
fn plan_explicit_module_jobs(
    graph: &mut JobGraph,
    options: &Options,
    imdg: &InterModuleDependencyGraph,
) -> Result<()> {
    for (id, info) in &imdg.modules {
        if id.is_placeholder() {
            return Err(DriverError::PlaceholderModuleEncountered(id.name().to_string()));
        }

        if matches!(info.details, ModuleDetails::Prebuilt(_)) && options.import_objc_header.is_some() {
            return Err(DriverError::UnsupportedConfigurationForCaching { module: id.name().to_string() });
        }

        let (kind, scanner_command_line) = match &info.details {
            ModuleDetails::Interface(d) => (JobKind::CompileModuleFromInterface, d.command_line.clone()),
            ModuleDetails::Clang(d) => (JobKind::GeneratePcm, d.command_line.clone()),
            ModuleDetails::Source | ModuleDetails::Prebuilt(_) | ModuleDetails::Placeholder => continue,
        };

        if imdg.closure_contains_placeholder(id) {
            return Err(DriverError::PlaceholderModuleEncountered(id.name().to_string()));
        }

        let mut command_line: Vec<ArgTemplate> = vec![
            ArgTemplate::literal("-disable-implicit-swift-modules"),
            ArgTemplate::literal("-fno-implicit-modules"),
        ];
        command_line.extend(scanner_command_line.into_iter().map(ArgTemplate::literal));

        for dep_id in imdg.transitive_closure(id) {
            if dep_id == id {
                continue;
            }
            let Some(dep_info) = imdg.get(dep_id) else { continue };
            match &dep_info.details {
                ModuleDetails::Interface(d) => {
                    command_line.push(ArgTemplate::literal(format!(
                        "-swift-module-file={}={}",
                        dep_id.name(),
                        d.cache_key,
                    )));
                    for candidate in &d.compiled_candidates {
                        command_line.push(ArgTemplate::literal("-candidate-module-file"));
                        command_line.push(ArgTemplate::Path(TypedPath::new(
                            VirtualPath::absolute(candidate.clone()),
                            FileType::CompiledModule,
                        )));
                    }
                }
                ModuleDetails::Clang(d) => {
                    command_line.push(ArgTemplate::literal(format!(
                        "-fmodule-file={}={}",
                        dep_id.name(),
                        dep_info.module_path.display(),
                    )));
                    command_line.push(ArgTemplate::literal("-fmodule-map-file"));
                    command_line.push(ArgTemplate::Path(TypedPath::new(
                        VirtualPath::absolute(d.module_map_path.clone()),
                        FileType::ModuleMap,
                    )));
                    command_line.push(ArgTemplate::literal("-fmodule-file-cache-key"));
                    command_line.push(ArgTemplate::literal(d.cache_key.clone()));
                }
                _ => {}
            }
        }

        if options.cache_compile_job {
            command_line.push(ArgTemplate::literal("-cache-compile-job"));
            command_line.push(ArgTemplate::literal("-cas-path"));
            if let Some(cas_path) = &options.cas_path {
                command_line.push(ArgTemplate::Path(TypedPath::new(
                    VirtualPath::absolute(cas_path.clone()),
                    FileType::DependencyInfo,
                )));
            }
        }

        graph.push(
            Job {
                module_name: id.name().to_string(),
                kind,
                tool_name: "frontend".into(),
                command_line,
                inputs: info
                    .source_files
                    .iter()
                    .map(|p| TypedPath::new(VirtualPath::absolute(p.clone()), FileType::Source))
                    .collect(),
                primary_inputs: vec![],
                outputs: vec![TypedPath::new(
                    VirtualPath::absolute(info.module_path.clone()),
                    FileType::CompiledModule,
                )],
                requires_in_place_execution: false,
                working_directory: options.working_directory.clone(),
            },
            vec![],
        );
    }

    if options.verify_emitted_module_interface && options.enable_library_evolution {
        graph.push(
            Job {
                module_name: "verify-module-interface".into(),
                kind: JobKind::VerifyModuleInterface,
                tool_name: "frontend".into(),
                command_line: vec![
                    ArgTemplate::literal("-explicit-interface-module-build"),
                    ArgTemplate::literal("-explicit-swift-module-map-file"),
                    ArgTemplate::literal("-disable-implicit-swift-modules"),
                    ArgTemplate::literal("-input-file-key"),
                ],
                inputs: vec![],
                primary_inputs: vec![],
                outputs: vec![],
                requires_in_place_execution: false,
                working_directory: options.working_directory.clone(),
            },
            vec![],
        );
    }

    Ok(())
}
