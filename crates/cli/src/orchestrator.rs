use crate::report::{FailureSite, Reporter, ResultAccumulator};
use sigcheck_buildfile::{BuildFileError, DiagnosticKind, TransactionalBuildFile};
use sigcheck_catalog::{
    callable_id, Callable, Catalog, Containment, SemanticType, Signature, TypeDescriptor,
};
use sigcheck_synth::{combinations, CallRenderer, Combination, ReturnUsageRenderer};
use sigcheck_templates::{OverrideContext, TemplateCatalog};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

const RETURN_VAR: &str = "ret";
const OBJECT_VAR: &str = "obj";
const RECEIVER_VAR: &str = "recv";

/// Checked with an emptied build file, since it must be the first statement
const PROJECT_FUNCTION: &str = "project";

/// Conditions that stop a run
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    BuildFile(#[from] BuildFileError),
}

pub type CheckResult<T> = std::result::Result<T, CheckError>;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Also pass each checked type to every callable that accepts it
    pub check_type_usages: bool,
    /// Also pass each return value to every callable that accepts it
    pub check_return_usages: bool,
    /// Describe checks by callable name only
    pub only_function_name: bool,
    pub max_combinations: Option<usize>,
}

/// One probe: setup lines, the call under test, then usages of its result
struct Probe {
    description: String,
    setup: Vec<String>,
    call: Vec<String>,
    usage: Vec<String>,
}

impl Probe {
    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.setup.len() + self.call.len() + self.usage.len());
        lines.extend(self.setup.iter().cloned());
        lines.extend(self.call.iter().cloned());
        lines.extend(self.usage.iter().cloned());
        lines
    }

    fn site(&self, offset: i64) -> FailureSite {
        let setup = self.setup.len() as i64;
        let call = setup + self.call.len() as i64;
        if offset < setup {
            FailureSite::Setup
        } else if offset < call {
            FailureSite::Call
        } else {
            FailureSite::ReturnValue
        }
    }
}

/// Drives signatures through synthesis and the build file, one probe at a
/// time, and tallies the verdicts.
pub struct CheckOrchestrator<'a> {
    catalog: &'a Catalog,
    templates: &'a TemplateCatalog,
    file: &'a mut TransactionalBuildFile,
    reporter: Reporter,
    options: CheckOptions,
    interrupted: Arc<AtomicBool>,
    results: ResultAccumulator,
}

impl<'a> CheckOrchestrator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        templates: &'a TemplateCatalog,
        file: &'a mut TransactionalBuildFile,
        reporter: Reporter,
        options: CheckOptions,
    ) -> Self {
        Self {
            catalog,
            templates,
            file,
            reporter,
            options,
            interrupted: Arc::new(AtomicBool::new(false)),
            results: ResultAccumulator::default(),
        }
    }

    /// Stop between probes once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    /// Check every type, then every function. An interrupt ends the run
    /// early with the results gathered so far.
    pub async fn run(
        mut self,
        types: &[&TypeDescriptor],
        functions: &[&Callable],
    ) -> CheckResult<ResultAccumulator> {
        match self.run_all(types, functions).await {
            Ok(()) => Ok(self.results),
            Err(CheckError::Interrupted) => {
                self.reporter.internal("Interrupted");
                Ok(self.results)
            }
            Err(err) => Err(err),
        }
    }

    async fn run_all(&mut self, types: &[&TypeDescriptor], functions: &[&Callable]) -> CheckResult<()> {
        for desc in types {
            self.check_type(desc).await?;
        }
        for callable in functions {
            self.check_function(callable).await?;
        }
        Ok(())
    }

    fn checkpoint(&self) -> CheckResult<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(CheckError::Interrupted);
        }
        Ok(())
    }

    fn describe(&self, id: &str, combination: &Combination<'_>) -> String {
        if self.options.only_function_name {
            id.to_string()
        } else {
            combination.describe(id)
        }
    }

    /// Every method of the type, called on a default instance
    pub async fn check_type(&mut self, desc: &TypeDescriptor) -> CheckResult<()> {
        self.checkpoint()?;
        let catalog = self.catalog;
        let templates = self.templates;
        let ty = SemanticType::named(desc.name.as_str());
        let object = match templates.resolve(&ty, &OverrideContext::none()) {
            Ok(literal) => literal,
            Err(err) => {
                self.reporter.internal(err);
                return Ok(());
            }
        };
        log::debug!("Checking type {}", desc.name);

        for method in catalog.methods_of(&desc.name) {
            let own_id = callable_id(Some(desc.name.as_str()), &method.callable.name);
            let receiver = templates
                .receiver_template(&own_id)
                .or_else(|| templates.receiver_template(&method.callable.id()))
                .unwrap_or_else(|| object.clone());
            let setup = vec![format!("{OBJECT_VAR} = {receiver}")];
            for signature in &method.callable.overloads {
                let renderer = CallRenderer::method(templates, signature, OBJECT_VAR)
                    .prefer_overrides_of(own_id.clone());
                self.check_signature(&own_id, signature, renderer, setup.clone())
                    .await?;
            }
        }

        if self.options.check_type_usages {
            let setup = vec![format!("{OBJECT_VAR} = {object}")];
            self.check_usages_of(&ty, setup, OBJECT_VAR, &desc.name).await?;
        }
        Ok(())
    }

    /// Every overload and combination of a function
    pub async fn check_function(&mut self, callable: &Callable) -> CheckResult<()> {
        self.checkpoint()?;
        if callable.name == PROJECT_FUNCTION && callable.receiver.is_none() {
            return self.check_project(callable).await;
        }
        log::debug!("Checking function {}", callable.name);
        let templates = self.templates;
        let id = callable.id();
        for signature in &callable.overloads {
            let renderer = CallRenderer::function(templates, signature);
            self.check_signature(&id, signature, renderer, Vec::new()).await?;
        }
        Ok(())
    }

    /// `project()` runs alone in an emptied file with inline arguments;
    /// the previous content comes back afterwards whatever happened.
    async fn check_project(&mut self, callable: &Callable) -> CheckResult<()> {
        self.file.snapshot()?;
        self.file.clear()?;
        let checked = self.check_project_calls(callable).await;
        self.file.restore()?;
        checked
    }

    async fn check_project_calls(&mut self, callable: &Callable) -> CheckResult<()> {
        let templates = self.templates;
        let id = callable.id();
        for signature in &callable.overloads {
            let renderer = CallRenderer::function(templates, signature);
            for combination in self.limited(signature) {
                self.checkpoint()?;
                let description = self.describe(&id, &combination);
                match renderer.render(&combination, None, true) {
                    Ok(call) => {
                        self.run_probe(Probe {
                            description,
                            setup: Vec::new(),
                            call,
                            usage: Vec::new(),
                        })
                        .await?;
                    }
                    Err(err) if err.is_template_miss() => self.reporter.internal(err),
                    Err(err) => {
                        self.reporter.internal(format!("{description}: {err}"));
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn limited<'s>(&self, signature: &'s Signature) -> Vec<Combination<'s>> {
        let mut combos = combinations(signature);
        if let Some(limit) = self.options.max_combinations {
            if combos.len() > limit {
                log::info!(
                    "{}: trying {limit} of {} combinations",
                    signature.callable_id(),
                    combos.len()
                );
                combos.truncate(limit);
            }
        }
        combos
    }

    /// Probe each combination with its return value captured and every
    /// method of the declared return type called on it.
    async fn check_signature(
        &mut self,
        id: &str,
        signature: &Signature,
        renderer: CallRenderer<'_>,
        setup: Vec<String>,
    ) -> CheckResult<()> {
        let bind = (!signature.returns.is_none_marker()).then_some(RETURN_VAR);
        let usage = match bind {
            Some(var) => ReturnUsageRenderer::new(self.catalog, self.templates)
                .render_all_usages(&signature.returns, var)
                .unwrap_or_else(|err| {
                    self.reporter.internal(format!("{id}: {err}"));
                    Vec::new()
                }),
            None => Vec::new(),
        };

        let mut first_call: Option<Vec<String>> = None;
        for combination in self.limited(signature) {
            self.checkpoint()?;
            let description = self.describe(id, &combination);
            let call = match renderer.render(&combination, bind, false) {
                Ok(call) => call,
                Err(err) if err.is_template_miss() => {
                    self.reporter.internal(format!("{description}: {err}"));
                    continue;
                }
                Err(err) => {
                    self.reporter.internal(format!("{description}: {err}"));
                    break;
                }
            };
            if first_call.is_none() {
                first_call = Some(call.clone());
            }
            self.run_probe(Probe {
                description,
                setup: setup.clone(),
                call,
                usage: usage.clone(),
            })
            .await?;
        }

        if let (true, Some(var), Some(call)) = (self.options.check_return_usages, bind, first_call) {
            if self.catalog.descriptor_for(&signature.returns).is_some() {
                let mut lines = setup;
                lines.extend(call);
                self.check_usages_of(&signature.returns, lines, var, id).await?;
            }
        }
        Ok(())
    }

    /// Pass the value held in `var` to every callable with a parameter
    /// that accepts `ty`, using the first combination that fits.
    async fn check_usages_of(
        &mut self,
        ty: &SemanticType,
        setup: Vec<String>,
        var: &str,
        origin: &str,
    ) -> CheckResult<()> {
        let catalog = self.catalog;
        let templates = self.templates;
        for callable in catalog.all_callables() {
            if callable.name == PROJECT_FUNCTION && callable.receiver.is_none() {
                continue;
            }
            for signature in &callable.overloads {
                self.checkpoint()?;
                let Some((slot, combination, containment)) = find_slot(catalog, signature, ty) else {
                    continue;
                };
                let id = signature.callable_id();
                let token = match containment {
                    Containment::Direct => var.to_string(),
                    Containment::Element => format!("[{var}]"),
                };

                let mut lines = setup.clone();
                let renderer = match &signature.receiver {
                    Some(receiver) => {
                        let literal = templates.receiver_template(&id).map(Ok).unwrap_or_else(|| {
                            templates.resolve(
                                &SemanticType::named(receiver.as_str()),
                                &OverrideContext::none(),
                            )
                        });
                        match literal {
                            Ok(literal) => lines.push(format!("{RECEIVER_VAR} = {literal}")),
                            Err(err) => {
                                self.reporter.internal(format!("{id}: {err}"));
                                continue;
                            }
                        }
                        CallRenderer::method(templates, signature, RECEIVER_VAR)
                    }
                    None => CallRenderer::function(templates, signature),
                };

                let description = format!(
                    "{} with {ty} from {origin} as '{slot}'",
                    self.describe(&id, &combination)
                );
                match renderer.bind(slot, token).render(&combination, None, false) {
                    Ok(call) => {
                        self.run_probe(Probe {
                            description,
                            setup: lines,
                            call,
                            usage: Vec::new(),
                        })
                        .await?;
                    }
                    Err(err) => self.reporter.internal(format!("{description}: {err}")),
                }
            }
        }
        Ok(())
    }

    async fn run_probe(&mut self, probe: Probe) -> CheckResult<()> {
        let lines = probe.lines();
        let outcome = self.file.probe(lines.as_slice()).await?;
        // Ctrl-C also reaches the tool; its output is not a verdict
        self.checkpoint()?;
        match outcome.kind {
            DiagnosticKind::FormatDrift => {
                self.reporter.internal(format!(
                    "{}: unrecognized diagnostic, did the output format change? {}",
                    probe.description, outcome.message
                ));
            }
            _ if outcome.passed() => {
                self.results.record(true);
                self.reporter.success(&probe.description);
            }
            _ => {
                self.results.record(false);
                let site = probe.site(outcome.offset.unwrap_or(0));
                self.reporter.failure(&probe.description, site, &outcome, &lines);
            }
        }
        Ok(())
    }
}

/// First parameter, in the first combination, whose concrete type accepts `ty`
fn find_slot<'s>(
    catalog: &Catalog,
    signature: &'s Signature,
    ty: &SemanticType,
) -> Option<(String, Combination<'s>, Containment)> {
    combinations(signature).into_iter().find_map(|combination| {
        let hit = combination.args.iter().find_map(|arg| {
            catalog
                .lattice()
                .containment(&arg.ty, ty)
                .map(|containment| (arg.param.name.clone(), containment))
        });
        hit.map(|(slot, containment)| (slot, combination, containment))
    })
}
