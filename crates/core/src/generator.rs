//! End-to-end driver.
//!
//! A run validates its [`Config`], discovers files, reads pre-generated mocks
//! and then pushes every source file through one staged pipeline:
//!
//! ```text
//! extract -> model -> resolve -> render -> imports -> write
//! ```
//!
//! Each stage is a barrier. Stages that need the whole picture (the resolver's
//! lookup maps, the type keys, the import union) build it from the previous
//! stage's complete output before fanning out again.

use crate::{
    config::Config,
    error::{Error, Result},
    extractor::{ExtractMode, Extraction, extract_file},
    model::model_entity,
    output::{OutputOptions, assemble, write_output},
    parser::{SwiftParser, SyntaxProvider},
    pipeline::{Executor, Task, TaskFailure},
    render::{RenderContext, RenderedEntity, render_entity},
    resolver::{Resolver, TypeKeys},
    scan::{self, ScannedFiles},
    types::{Entity, ImportDecl, ResolvedEntity},
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Payload flowing between pipeline stages
enum Unit {
    Source(PathBuf),
    Extracted(Extraction),
    Modeled(Entity),
    FileImports(PathBuf, Vec<ImportDecl>),
    Keys(Arc<TypeKeys>),
    Resolved(ResolvedEntity),
    Rendered(RenderedEntity, Vec<ImportDecl>),
    Imports(Vec<ImportDecl>),
    Written(String),
}

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub source_files: usize,
    pub mock_files: usize,
    /// Annotated declarations found, counting a duplicated name once
    pub entities: usize,
    pub stand_ins: usize,
    /// Mocks written to the output
    pub rendered: usize,
    /// Files that could not be read or parsed
    pub failed_files: Vec<PathBuf>,
    /// Every unit that failed, including the files above
    pub failures: Vec<TaskFailure>,
    pub destination: PathBuf,
    pub output: String,
}

#[derive(Default)]
struct Counters {
    entities: AtomicUsize,
    rendered: AtomicUsize,
}

pub struct Generator {
    config: Config,
    provider: Arc<dyn SyntaxProvider>,
}

impl Generator {
    /// Validate `config` and set up the tree-sitter provider
    pub fn new(config: Config) -> Result<Self> {
        let provider = SwiftParser::new()?;
        Self::with_provider(config, Arc::new(provider))
    }

    pub fn with_provider(config: Config, provider: Arc<dyn SyntaxProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover inputs from the configuration and generate
    pub fn run(&self) -> Result<GenerationReport> {
        let files = scan::collect(&self.config)?;
        self.generate(&files)
    }

    /// Generate mocks for an explicit set of files
    pub fn generate(&self, files: &ScannedFiles) -> Result<GenerationReport> {
        let destination = self
            .config
            .destination
            .clone()
            .ok_or_else(|| Error::ConfigError("no destination given".to_string()))?;
        let executor = Executor::new(self.config.concurrency())?;
        let started = Instant::now();

        info!("Processing {} pre-generated mock file(s)", files.mocks.len());
        let stand_ins = self.read_stand_ins(&files.mocks, &executor)?;
        let stand_in_count = stand_ins.entities.len();
        debug!(
            "Read {stand_in_count} stand-in mock(s) in {:?}",
            started.elapsed()
        );

        info!("Generating mocks from {} source file(s)", files.sources.len());
        let counters = Arc::new(Counters::default());
        let custom_imports = Arc::new(AtomicBool::new(false));
        let task = self.pipeline(
            Arc::new(stand_ins),
            destination.clone(),
            Arc::clone(&counters),
            Arc::clone(&custom_imports),
        );
        let input = files.sources.iter().cloned().map(Unit::Source).collect();
        let output = executor.run(task, input)?;

        let text = output
            .into_iter()
            .find_map(|unit| match unit {
                Unit::Written(text) => Some(text),
                _ => None,
            })
            .unwrap_or_default();

        let failures = executor.take_failures();
        let inputs: HashSet<&Path> = files
            .sources
            .iter()
            .chain(files.mocks.iter())
            .map(PathBuf::as_path)
            .collect();
        let failed_files: Vec<PathBuf> = failures
            .iter()
            .map(|f| PathBuf::from(&f.label))
            .filter(|p| inputs.contains(p.as_path()))
            .collect();
        for path in &failed_files {
            debug!("Failed to process {}", path.display());
        }

        let report = GenerationReport {
            source_files: files.sources.len(),
            mock_files: files.mocks.len(),
            entities: counters.entities.load(Ordering::SeqCst),
            stand_ins: stand_in_count,
            rendered: counters.rendered.load(Ordering::SeqCst),
            failed_files,
            failures,
            destination,
            output: text,
        };
        info!(
            "Wrote {} mock(s) to {} in {:?}",
            report.rendered,
            report.destination.display(),
            started.elapsed()
        );
        Ok(report)
    }

    fn read_stand_ins(&self, mocks: &[PathBuf], executor: &Executor) -> Result<StandIns> {
        let tasks = mocks
            .iter()
            .map(|path| {
                let provider = Arc::clone(&self.provider);
                let path = path.clone();
                Task::new(path.display().to_string(), move |_| {
                    let extraction =
                        extract_file(provider.as_ref(), &path, &ExtractMode::ProcessExisting)?;
                    Ok(vec![Unit::Extracted(extraction)])
                })
            })
            .collect();
        let output = executor.run(Task::group("stand-ins", tasks), Vec::new())?;

        let mut stand_ins = StandIns::default();
        for unit in output {
            if let Unit::Extracted(extraction) = unit {
                stand_ins
                    .imports
                    .push((extraction.path.clone(), extraction.imports));
                stand_ins
                    .entities
                    .extend(extraction.entities.into_iter().map(model_entity));
            }
        }
        Ok(stand_ins)
    }

    fn pipeline(
        &self,
        stand_ins: Arc<StandIns>,
        destination: PathBuf,
        counters: Arc<Counters>,
        custom_imports: Arc<AtomicBool>,
    ) -> Task<Unit> {
        let provider = Arc::clone(&self.provider);
        let mode = ExtractMode::Annotated {
            annotation: self.config.annotation().to_string(),
        };
        let header = self.config.header.clone();
        let macro_name = self.config.macro_name.clone();
        let testable_imports = self.config.testable_imports.clone();
        let render_flag = Arc::clone(&custom_imports);
        let rendered_count = Arc::clone(&counters);

        Task::sequence(
            "generate",
            vec![
                Task::fan_out("extract", move |units: Vec<Unit>| {
                    Ok(units
                        .into_iter()
                        .filter_map(|unit| match unit {
                            Unit::Source(path) => Some(extract_task(&provider, path, &mode)),
                            _ => None,
                        })
                        .collect())
                }),
                Task::fan_out("model", move |units: Vec<Unit>| {
                    let mut tasks = Vec::new();
                    for unit in units {
                        let Unit::Extracted(extraction) = unit else {
                            continue;
                        };
                        let path = extraction.path;
                        tasks.push(pass_through(
                            "imports",
                            Unit::FileImports(path.clone(), extraction.imports),
                        ));
                        for entity in extraction.entities {
                            let label = format!("model {}", entity.name);
                            tasks.push(Task::new(label, move |_| {
                                Ok(vec![Unit::Modeled(model_entity(entity))])
                            }));
                        }
                    }
                    Ok(tasks)
                }),
                Task::fan_out("resolve", move |units: Vec<Unit>| {
                    resolve_tasks(units, &stand_ins, &counters)
                }),
                Task::fan_out("render", move |units: Vec<Unit>| {
                    Ok(render_tasks(units, &render_flag, &rendered_count))
                }),
                Task::fan_out("imports", |units: Vec<Unit>| {
                    Ok(vec![Task::new("merge imports", move |_| {
                        Ok(merge_imports(units))
                    })])
                }),
                Task::new("write", move |units: Vec<Unit>| {
                    let mut entities = Vec::new();
                    let mut imports = Vec::new();
                    for unit in units {
                        match unit {
                            Unit::Rendered(entity, _) => entities.push(entity),
                            Unit::Imports(collected) => imports = collected,
                            _ => {}
                        }
                    }
                    let options = OutputOptions {
                        header: header.as_deref(),
                        macro_name: macro_name.as_deref(),
                        testable_imports: &testable_imports,
                        custom_imports: custom_imports.load(Ordering::SeqCst),
                    };
                    let text = assemble(entities, &imports, &options);
                    write_output(&destination, &text)?;
                    Ok(vec![Unit::Written(text)])
                }),
            ],
        )
    }
}

/// Entities and imports read from pre-generated mock files
#[derive(Debug, Default)]
struct StandIns {
    entities: Vec<Entity>,
    imports: Vec<(PathBuf, Vec<ImportDecl>)>,
}

fn extract_task(provider: &Arc<dyn SyntaxProvider>, path: PathBuf, mode: &ExtractMode) -> Task<Unit> {
    let provider = Arc::clone(provider);
    let mode = mode.clone();
    Task::new(path.display().to_string(), move |_| {
        let extraction = extract_file(provider.as_ref(), &path, &mode)?;
        if !extraction.entities.is_empty() {
            debug!(
                "Extracted {} entity(ies) from {}",
                extraction.entities.len(),
                path.display()
            );
        }
        Ok(vec![Unit::Extracted(extraction)])
    })
}

/// Strip each rendered entity's imports and append their sorted union
fn merge_imports(units: Vec<Unit>) -> Vec<Unit> {
    let mut imports = BTreeSet::new();
    let mut rendered = Vec::new();
    for unit in units {
        if let Unit::Rendered(entity, entity_imports) = unit {
            imports.extend(entity_imports);
            rendered.push(Unit::Rendered(entity, Vec::new()));
        }
    }
    rendered.push(Unit::Imports(imports.into_iter().collect()));
    rendered
}

fn pass_through(label: &str, unit: Unit) -> Task<Unit> {
    Task::new(label, move |_| Ok(vec![unit]))
}

/// Barrier: build the shared resolver, then resolve each root on its own
fn resolve_tasks(
    units: Vec<Unit>,
    stand_ins: &StandIns,
    counters: &Counters,
) -> Result<Vec<Task<Unit>>> {
    let mut entities = Vec::new();
    let mut imports: HashMap<PathBuf, Vec<ImportDecl>> = stand_ins.imports.iter().cloned().collect();
    for unit in units {
        match unit {
            Unit::Modeled(entity) => entities.push(entity),
            Unit::FileImports(path, file_imports) => {
                imports.insert(path, file_imports);
            }
            _ => {}
        }
    }

    let resolver = Arc::new(Resolver::new(entities, stand_ins.entities.clone(), imports));
    counters
        .entities
        .store(resolver.entity_count(), Ordering::SeqCst);
    let keys = Arc::new(resolver.type_keys());
    debug!("{} type key(s) available for defaults", keys.len());

    let mut tasks = vec![pass_through("type-keys", Unit::Keys(keys))];
    for root in resolver.roots() {
        let resolver = Arc::clone(&resolver);
        tasks.push(Task::new(format!("resolve {}", root.name), move |_| {
            Ok(vec![Unit::Resolved(resolver.resolve(&root))])
        }));
    }
    Ok(tasks)
}

fn render_tasks(
    units: Vec<Unit>,
    custom_imports: &Arc<AtomicBool>,
    counters: &Arc<Counters>,
) -> Vec<Task<Unit>> {
    let mut keys = Arc::new(TypeKeys::new());
    let mut resolved = Vec::new();
    for unit in units {
        match unit {
            Unit::Keys(k) => keys = k,
            Unit::Resolved(entity) => resolved.push(entity),
            _ => {}
        }
    }

    resolved
        .into_iter()
        .map(|entity| {
            let keys = Arc::clone(&keys);
            let flag = Arc::clone(custom_imports);
            let counters = Arc::clone(counters);
            Task::new(format!("render {}", entity.entity.name), move |_| {
                let ctx = RenderContext::new(&keys, &flag);
                let rendered = render_entity(&entity, &ctx)?;
                counters.rendered.fetch_add(1, Ordering::SeqCst);
                Ok(vec![Unit::Rendered(rendered, entity.imports)])
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path, limit: usize) -> Config {
        Config {
            source_dirs: vec![root.join("Sources")],
            destination: Some(root.join("Mocks.swift")),
            concurrency_limit: Some(limit),
            ..Default::default()
        }
    }

    fn write(root: &Path, relative: &str, text: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Generator::new(Config::default());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_generates_protocol_mock() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "Sources/Service.swift",
            "import Foundation\n\n/// @mockable\nprotocol Service {\n    func fetch() -> Int\n}\n",
        );
        write(root, "Sources/Plain.swift", "protocol Plain {\n    func a()\n}\n");

        let report = Generator::new(config(root, 2)).unwrap().run().unwrap();
        assert_eq!(report.source_files, 2);
        assert_eq!(report.entities, 1);
        assert_eq!(report.rendered, 1);
        assert!(report.failed_files.is_empty());

        let written = fs::read_to_string(root.join("Mocks.swift")).unwrap();
        assert_eq!(written, report.output);
        assert!(written.starts_with("import Foundation\n\nclass ServiceMock: Service {"));
        assert!(written.contains("var fetchCallCount = 0"));
        assert!(!written.contains("PlainMock"));
        assert!(written.ends_with("}\n"));
    }

    #[test]
    fn test_missing_file_is_reported_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let good = write(
            root,
            "Good.swift",
            "/// @mockable\nprotocol Good {\n    var name: String { get }\n}\n",
        );
        let missing = root.join("Missing.swift");
        let generator = Generator::new(Config {
            source_files: vec![good.clone(), missing.clone()],
            destination: Some(root.join("Out.swift")),
            concurrency_limit: Some(1),
            ..Default::default()
        })
        .unwrap();

        let report = generator
            .generate(&ScannedFiles {
                sources: vec![good, missing.clone()],
                mocks: Vec::new(),
            })
            .unwrap();
        assert_eq!(report.failed_files, vec![missing]);
        assert_eq!(report.rendered, 1);
        assert!(report.output.contains("class GoodMock: Good"));
    }

    #[test]
    fn test_stand_in_suppresses_regeneration() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "Sources/Api.swift",
            "/// @mockable\nprotocol Api {\n    func call()\n}\n\n/// @mockable\nprotocol Client: Api {\n    func start()\n}\n",
        );
        let mock = write(
            root,
            "Deps/ApiMock.swift",
            "class ApiMock: Api {\n    init() { }\n    var callCallCount = 0\n    func call() {\n        callCallCount += 1\n    }\n}\n",
        );

        let report = Generator::new(Config {
            mock_files: vec![mock],
            ..config(root, 4)
        })
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(report.stand_ins, 1);
        assert_eq!(report.rendered, 1);
        assert!(!report.output.contains("class ApiMock"));
        assert!(report.output.contains("class ClientMock: Client"));
        assert!(report.output.contains("var callCallCount = 0"));
        assert!(report.output.contains("var startCallCount = 0"));
    }

    #[test]
    fn test_final_class_is_dropped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "Sources/Model.swift",
            "/// @mockable\nfinal class Locked {\n    func open() {}\n}\n\n/// @mockable\nprotocol Door {\n    func open()\n}\n",
        );
        let report = Generator::new(config(root, 1)).unwrap().run().unwrap();
        assert_eq!(report.entities, 2);
        assert_eq!(report.rendered, 1);
        assert!(report.failures.iter().any(|f| f.label == "render Locked"));
        assert!(report.failed_files.is_empty());
    }

    #[test]
    fn test_duplicate_names_count_once() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "Sources/A.swift", "/// @mockable\nprotocol Feed {\n    func a()\n}\n");
        write(root, "Sources/B.swift", "/// @mockable\nprotocol Feed {\n    func b()\n}\n");

        let report = Generator::new(config(root, 2)).unwrap().run().unwrap();
        assert_eq!(report.entities, 1);
        assert_eq!(report.rendered, 1);
        assert_eq!(report.output.matches("class FeedMock: Feed").count(), 1);
    }

    #[test]
    fn test_merge_imports_unions_and_strips() {
        let import = |statement: &str| ImportDecl {
            statement: statement.to_string(),
            guard: None,
        };
        let rendered = |name: &str| RenderedEntity {
            name: name.to_string(),
            text: String::new(),
            offset: 0,
            path: PathBuf::from("A.swift"),
        };
        let units = vec![
            Unit::Rendered(rendered("AMock"), vec![import("import UIKit"), import("import Foundation")]),
            Unit::Rendered(rendered("BMock"), vec![import("import Foundation")]),
        ];

        let merged = merge_imports(units);
        assert_eq!(merged.len(), 3);
        for unit in &merged[..2] {
            assert!(matches!(unit, Unit::Rendered(_, imports) if imports.is_empty()));
        }
        let Unit::Imports(imports) = &merged[2] else {
            panic!("imports must come last");
        };
        let statements: Vec<&str> = imports.iter().map(|i| i.statement.as_str()).collect();
        assert_eq!(statements, vec!["import Foundation", "import UIKit"]);
    }
}
