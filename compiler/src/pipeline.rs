//! Front-end pipeline: source -> AST -> checked program
//!
//! Phases, each finishing before the next starts:
//! 1. Class discovery
//! 2. Built-in validation
//! 3. Member collection
//! 4. Subtype pass (parents, cycles, subtype sets)
//! 5. Static check
//! 6. Dispatch table construction
//!
//! The first failure stops the pipeline.

use crate::checker::check_program;
use crate::discovery::discover_classes;
use crate::dispatch::build_dispatch_tables;
use crate::error::{SemanticError, SemanticResult};
use crate::members::collect_members;
use crate::prelude::load_prelude;
use crate::registry::{BuiltinClasses, ClassRegistry};
use crate::subtypes::compute_subtypes;
use diagnostics::mino::MinoDiagnostics;
use diagnostics::{Diagnostic, FileId, SourceMap};
use log::info;
use parser::{parse_mino_file, MinoFile, ParseError, Stmt};
use std::time::{Duration, Instant};

/// Front-end configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Parse the bundled built-in declarations ahead of the user file
    pub use_prelude: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { use_prelude: true }
    }
}

/// A checked program, ready to interpret
#[derive(Debug)]
pub struct Program {
    pub registry: ClassRegistry,
    pub builtins: BuiltinClasses,
    /// Top-level statements of the main file
    pub main: Vec<Stmt>,
    pub main_file: FileId,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub files: usize,
    pub classes: usize,
    pub methods: usize,
    pub parse_time: Duration,
    pub analysis_time: Duration,
}

/// Failure before interpretation starts
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrontendError {
    #[error("{error}")]
    Syntax { error: ParseError, file: FileId },
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl FrontendError {
    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic {
        match self {
            FrontendError::Syntax { error, file } => {
                MinoDiagnostics::syntax_error(&error.message, Some(error.location(*file)), source_map)
            }
            FrontendError::Semantic(error) => error.to_diagnostic(source_map),
        }
    }
}

#[derive(Debug, Default)]
pub struct MinoPipeline {
    pub config: PipelineOptions,
    stats: PipelineStats,
}

impl MinoPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineOptions) -> Self {
        Self {
            config,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Parse `source` (plus the prelude when enabled) and analyze it
    pub fn compile_source(
        &mut self,
        source_map: &mut SourceMap,
        name: &str,
        source: &str,
    ) -> Result<Program, FrontendError> {
        let started = Instant::now();
        let mut files = Vec::with_capacity(2);
        if self.config.use_prelude {
            let prelude = load_prelude(source_map).map_err(|error| FrontendError::Syntax {
                error,
                file: FileId::new(source_map.len() - 1),
            })?;
            files.push(prelude);
        }
        let file = source_map.add_file(name, source);
        let parsed = parse_mino_file(file, name, source)
            .map_err(|error| FrontendError::Syntax { error, file })?;
        files.push(parsed);
        self.stats.parse_time += started.elapsed();

        Ok(self.analyze(&files)?)
    }

    /// Run every semantic phase over already parsed files.
    ///
    /// The last file is the main file; its statements form the main program.
    pub fn analyze(&mut self, files: &[MinoFile]) -> SemanticResult<Program> {
        let started = Instant::now();
        let mut registry = ClassRegistry::new();

        let classes = discover_classes(&mut registry, files)?;
        let builtins = registry.builtins()?;
        collect_members(&mut registry, &classes)?;
        let order = compute_subtypes(&mut registry, &classes, &builtins)?;

        let (main, main_file) = match files.last() {
            Some(file) => (file.statements.clone(), file.file_id),
            None => (Vec::new(), FileId::default()),
        };
        check_program(&registry, builtins, &main, main_file)?;
        build_dispatch_tables(&mut registry, &order);

        self.stats.files += files.len();
        self.stats.classes += registry.len();
        self.stats.methods += registry.methods().count();
        self.stats.analysis_time += started.elapsed();
        info!(
            "analysis finished: {} classes, {} methods in {:?}",
            registry.len(),
            registry.methods().count(),
            started.elapsed()
        );

        Ok(Program {
            registry,
            builtins,
            main,
            main_file,
        })
    }
}

/// Analyze parsed files with default options
pub fn analyze(files: &[MinoFile]) -> SemanticResult<Program> {
    MinoPipeline::new().analyze(files)
}

/// Parse and analyze a single source with the prelude
pub fn compile_mino_source(
    source_map: &mut SourceMap,
    name: &str,
    source: &str,
) -> Result<Program, FrontendError> {
    MinoPipeline::new().compile_source(source_map, name, source)
}
