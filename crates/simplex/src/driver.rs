//! The model driver: parse, analyze, execute products, write artifacts.
//!
//! The three run states are separate types moved through by value:
//! [`Runner::parse`] produces a parsed runner, [`Runner::analyze`] a
//! [`Program`] with its root environment and frozen registry, and
//! [`Program::execute`] runs products and reports per-product outcomes.

use std::rc::Rc;

use log::{debug, info};
use simplex_geom::Solid;

use crate::{
    analyze,
    artifact::ArtifactWriter,
    ast::Model,
    builtins::Builtin,
    env::EnvArena,
    error::SimplexError,
    eval::Evaluator,
    parse::parse,
    registry::TypeRegistry,
    value::Value,
};

/// A parsed model, ready for analysis.
#[derive(Debug)]
pub struct Runner {
    model: Model,
    source_name: String,
}

impl Runner {
    /// Parses source text into a model.
    pub fn parse(source: &str, source_name: &str) -> Result<Self, SimplexError> {
        let model = parse(source)?;
        debug!(
            "parsed {}: {} definition(s), {} product(s)",
            source_name,
            model.definitions.len(),
            model.products.len()
        );
        Ok(Self {
            model,
            source_name: source_name.to_owned(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Runs static analysis: builds the root environment, installs the
    /// static half of every definition, then validates definitions and
    /// product bodies.
    ///
    /// Any analysis error aborts the run; all collected diagnostics are
    /// returned so users see every offending definition at once.
    pub fn analyze(self) -> Result<Program, Vec<SimplexError>> {
        let mut envs = EnvArena::new();
        let root = envs.root();
        let mut registry = TypeRegistry::with_builtins();
        Builtin::install_all(&mut envs, root);

        let mut errors = analyze::install_static(&self.model.definitions, root, &mut envs, &mut registry);
        errors.extend(analyze::validate_definitions(
            &self.model.definitions,
            root,
            &mut envs,
            &registry,
        ));
        for product in &self.model.products {
            if let Err(err) = analyze::validate_product(product, root, &mut envs, &registry) {
                errors.push(err);
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        debug!("analysis of {} passed", self.source_name);
        Ok(Program {
            model: self.model,
            envs,
            registry,
        })
    }
}

/// An analyzed model: the AST plus the root environment and the frozen
/// operation-table registry.
#[derive(Debug)]
pub struct Program {
    model: Model,
    envs: EnvArena,
    registry: TypeRegistry,
}

/// What happened to one product.
#[derive(Debug)]
pub struct ProductOutcome {
    pub name: String,
    /// Artifact file names written for this product.
    pub files: Vec<String>,
    /// Set when evaluation of this product aborted.
    pub error: Option<SimplexError>,
}

/// The outcome of executing a program's products.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Set when the top-level value install failed; no products ran.
    pub install_error: Option<SimplexError>,
    pub products: Vec<ProductOutcome>,
}

impl ExecutionReport {
    /// True when installation and every product succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.install_error.is_none() && self.products.iter().all(|p| p.error.is_none())
    }

    /// Every error in the report, install first.
    pub fn errors(&self) -> impl Iterator<Item = &SimplexError> {
        self.install_error
            .iter()
            .chain(self.products.iter().filter_map(|p| p.error.as_ref()))
    }
}

impl Program {
    /// Executes products and writes their artifacts.
    ///
    /// `requested` selects products by name; `None` runs all in source
    /// order. An evaluation failure aborts only the offending product; the
    /// driver reports it and continues with the next.
    pub fn execute(
        &mut self,
        requested: Option<&[String]>,
        prefix: &str,
        writer: &mut dyn ArtifactWriter,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let root = self.envs.root();
        {
            let mut evaluator = Evaluator::new(&mut self.envs, &self.registry);
            if let Err(err) = evaluator.install_values(&self.model.definitions, root) {
                report.install_error = Some(err);
                return report;
            }
        }

        let selected: Vec<&crate::ast::Product> = match requested {
            None => self.model.products.iter().collect(),
            Some(names) => {
                for name in names {
                    if !self.model.products.iter().any(|p| &p.name == name) {
                        report.products.push(ProductOutcome {
                            name: name.clone(),
                            files: Vec::new(),
                            error: Some(SimplexError::undefined_name(name)),
                        });
                    }
                }
                self.model
                    .products
                    .iter()
                    .filter(|p| names.contains(&p.name))
                    .collect()
            }
        };

        for product in selected {
            let outcome = run_product(product, &mut self.envs, &self.registry, prefix, writer);
            report.products.push(outcome);
        }
        report
    }
}

fn run_product(
    product: &crate::ast::Product,
    envs: &mut EnvArena,
    registry: &TypeRegistry,
    prefix: &str,
    writer: &mut dyn ArtifactWriter,
) -> ProductOutcome {
    info!("evaluating product \"{}\"", product.name);
    let root = envs.root();
    let scope = envs.push(root);
    let mut evaluator = Evaluator::new(envs, registry);
    let results = match evaluator.eval_product_body(&product.body, scope) {
        Ok(results) => results,
        Err(err) => {
            return ProductOutcome {
                name: product.name.clone(),
                files: Vec::new(),
                error: Some(err),
            };
        }
    };

    let mut solids: Vec<Rc<Solid>> = Vec::new();
    let mut others: Vec<Value> = Vec::new();
    for value in results {
        match value {
            Value::Solid(solid) => solids.push(solid),
            other => others.push(other),
        }
    }

    let mut files = Vec::new();
    let mut error = None;
    if let Some((first, rest)) = solids.split_first() {
        let combined = rest.iter().fold((**first).clone(), |acc, solid| acc.union(solid));
        let file_name = format!("{prefix}-{}.stl", product.name);
        debug!("writing {} ({} faces)", file_name, combined.face_count());
        match writer.write_artifact(&file_name, &combined.to_stl(&product.name)) {
            Ok(()) => files.push(file_name),
            Err(err) => error = Some(err),
        }
    }
    if error.is_none() && !others.is_empty() {
        let mut contents = String::new();
        for value in &others {
            contents.push_str(&value.to_string());
            contents.push('\n');
        }
        let file_name = format!("{prefix}-{}.txt", product.name);
        debug!("writing {}", file_name);
        match writer.write_artifact(&file_name, &contents) {
            Ok(()) => files.push(file_name),
            Err(err) => error = Some(err),
        }
    }
    ProductOutcome {
        name: product.name.clone(),
        files,
        error,
    }
}
