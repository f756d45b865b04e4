//! Configuration of the reconstruction: jet selection, b-tag requirement and rank strategy.
//!
//! Everything here can be built in code with builder-style setters or read from JSON:
//!
//! ```json
//! {
//!   "selection": { "min_pt": 30.0, "max_abs_eta": 2.4 },
//!   "b_tag": { "working_point": { "threshold": 0.8 }, "mode": "at_least_one_tagged" },
//!   "strategy": {
//!     "kind": "chi2",
//!     "terms": [
//!       { "expression": "mass_top_had", "mean": 173.0, "variance": 20.0 },
//!       { "expression": "mass_w_had", "mean": 80.4, "variance": 10.0 }
//!     ]
//!   }
//! }
//! ```
//!
//! A likelihood strategy instead names a JSON table resource (see [`crate::table`]):
//! `{ "kind": "likelihood", "tables": "tables.json", "neutrino_table": "nu", "mass_table": "m" }`.
//! Relative table paths are resolved against the directory of the configuration file when it is
//! read with [`RecoConfig::from_path`].

use crate::assignment::JetAssigner;
use crate::chi2::Chi2Strategy;
use crate::likelihood::LikelihoodStrategy;
use crate::strategy::AnyStrategy;
use crate::table::{DensityTable1D, DensityTable2D, TableSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tt_core::{BTagWorkingPoint, Error, Jet, Result};
use tt_nu::{DEFAULT_TOP_MASS, DEFAULT_W_MASS, W_MASS};

/// Infinite bounds are written as `null` (or omitted) in JSON.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        if x.is_finite() { s.serialize_some(x) } else { s.serialize_none() }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

fn infinity() -> f64 {
    f64::INFINITY
}

fn default_quadratic_w_mass() -> f64 {
    W_MASS
}

fn default_ellipse_w_mass() -> f64 {
    DEFAULT_W_MASS
}

fn default_ellipse_top_mass() -> f64 {
    DEFAULT_TOP_MASS
}

fn validate_mass(what: &str, m: f64) -> Result<()> {
    if !(m.is_finite() && m > 0.0) {
        return Err(Error::Validation(format!("{what} must be finite and >0, got {m}")));
    }
    Ok(())
}

/// Kinematic jet selection applied before the combinatorial search.
///
/// Jets are scanned in the order given. A jet outside `|eta| <= max_abs_eta` is skipped; the
/// first jet with `pt < min_pt` ends the scan, since input jets are ordered in pt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JetSelection {
    /// Minimal transverse momentum, GeV.
    #[serde(default)]
    pub min_pt: f64,
    /// Maximal absolute pseudorapidity.
    #[serde(default = "infinity", with = "unbounded")]
    pub max_abs_eta: f64,
}

impl Default for JetSelection {
    fn default() -> Self {
        Self { min_pt: 0.0, max_abs_eta: f64::INFINITY }
    }
}

impl JetSelection {
    /// Selection with the given thresholds.
    pub fn new(min_pt: f64, max_abs_eta: f64) -> Self {
        Self { min_pt, max_abs_eta }
    }

    /// Set the minimal pt.
    pub fn min_pt(mut self, min_pt: f64) -> Self {
        self.min_pt = min_pt;
        self
    }

    /// Set the maximal `|eta|`.
    pub fn max_abs_eta(mut self, max_abs_eta: f64) -> Self {
        self.max_abs_eta = max_abs_eta;
        self
    }

    /// Check the thresholds.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_pt.is_finite() && self.min_pt >= 0.0) {
            return Err(Error::Validation(format!(
                "min_pt must be finite and >=0, got {}",
                self.min_pt
            )));
        }
        if self.max_abs_eta.is_nan() || self.max_abs_eta < 0.0 {
            return Err(Error::Validation(format!(
                "max_abs_eta must be >=0, got {}",
                self.max_abs_eta
            )));
        }
        Ok(())
    }
}

/// How the two b-quark candidates must pass the b-tagging working point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BTagMode {
    /// Both b candidates tagged.
    #[default]
    BothTagged,
    /// At least one of the b candidates tagged.
    AtLeastOneTagged,
}

/// Requirement on b tags of the jets assigned to the b quarks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BTagRequirement {
    /// Working point defining a tagged jet.
    pub working_point: BTagWorkingPoint,
    /// Which candidates must be tagged.
    #[serde(default)]
    pub mode: BTagMode,
}

impl BTagRequirement {
    /// Create a requirement.
    pub fn new(working_point: BTagWorkingPoint, mode: BTagMode) -> Self {
        Self { working_point, mode }
    }

    /// Whether the pair of b candidates satisfies the requirement.
    pub fn accepts(&self, b_top_lep: &Jet, b_top_had: &Jet) -> bool {
        let lep = b_top_lep.is_b_tagged(&self.working_point);
        let had = b_top_had.is_b_tagged(&self.working_point);
        match self.mode {
            BTagMode::BothTagged => lep && had,
            BTagMode::AtLeastOneTagged => lep || had,
        }
    }
}

/// Observable entering a chi-squared term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chi2Expression {
    /// `m(l + nu + b_lep)`.
    MassTopLep,
    /// `m(b_had + q1 + q2)`.
    MassTopHad,
    /// `m(q1 + q2)`.
    MassWHad,
    /// `pt(l + nu + b_lep + b_had + q1 + q2)`.
    PtTt,
}

/// One term `((x - mean) / variance)^2` of the chi-squared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chi2TermConfig {
    /// Observable.
    pub expression: Chi2Expression,
    /// Expected value.
    pub mean: f64,
    /// Normalization of the deviation. Despite the name it enters unsquared, so it has the
    /// units of the observable.
    pub variance: f64,
}

impl Chi2TermConfig {
    /// Check that the term is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(Error::Validation(format!(
                "chi2 term {:?}: mean must be finite, got {}",
                self.expression, self.mean
            )));
        }
        if !(self.variance.is_finite() && self.variance > 0.0) {
            return Err(Error::Validation(format!(
                "chi2 term {:?}: variance must be finite and >0, got {}",
                self.expression, self.variance
            )));
        }
        Ok(())
    }
}

/// Configuration of the chi-squared rank strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chi2Config {
    /// Terms, summed in order.
    #[serde(default)]
    pub terms: Vec<Chi2TermConfig>,
    /// W-boson mass used to reconstruct the neutrino.
    #[serde(default = "default_quadratic_w_mass")]
    pub w_mass: f64,
}

impl Default for Chi2Config {
    fn default() -> Self {
        Self { terms: Vec::new(), w_mass: W_MASS }
    }
}

impl Chi2Config {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a term.
    pub fn term(mut self, expression: Chi2Expression, mean: f64, variance: f64) -> Self {
        self.terms.push(Chi2TermConfig { expression, mean, variance });
        self
    }

    /// Set the W-boson mass used by the neutrino solver.
    pub fn w_mass(mut self, w_mass: f64) -> Self {
        self.w_mass = w_mass;
        self
    }

    /// Check every term and the mass hypothesis.
    pub fn validate(&self) -> Result<()> {
        validate_mass("chi2 w_mass", self.w_mass)?;
        self.terms.iter().try_for_each(Chi2TermConfig::validate)
    }
}

/// Configuration of the likelihood rank strategy.
#[derive(Debug, Clone)]
pub struct LikelihoodConfig {
    /// Density of the distance between the ellipse neutrino and the MET.
    pub neutrino_table: Arc<DensityTable1D>,
    /// Density of `(m(q1 + q2), m(b_had + q1 + q2))`.
    pub mass_table: Arc<DensityTable2D>,
    /// W-boson mass hypothesis of the ellipse solver.
    pub w_mass: f64,
    /// Top-quark mass hypothesis of the ellipse solver.
    pub top_mass: f64,
    /// Weight the neutrino distance with the event's MET covariance instead of the identity.
    pub use_event_met_covariance: bool,
}

impl LikelihoodConfig {
    /// Configuration with the given tables and default mass hypotheses.
    pub fn new(neutrino_table: Arc<DensityTable1D>, mass_table: Arc<DensityTable2D>) -> Self {
        Self {
            neutrino_table,
            mass_table,
            w_mass: DEFAULT_W_MASS,
            top_mass: DEFAULT_TOP_MASS,
            use_event_met_covariance: false,
        }
    }

    /// Take the named tables from a table set.
    pub fn from_table_set(set: &TableSet, neutrino_table: &str, mass_table: &str) -> Result<Self> {
        Ok(Self::new(
            Arc::new(set.table_1d(neutrino_table)?),
            Arc::new(set.table_2d(mass_table)?),
        ))
    }

    /// Set the W-boson mass hypothesis.
    pub fn w_mass(mut self, w_mass: f64) -> Self {
        self.w_mass = w_mass;
        self
    }

    /// Set the top-quark mass hypothesis.
    pub fn top_mass(mut self, top_mass: f64) -> Self {
        self.top_mass = top_mass;
        self
    }

    /// Choose whether the event's MET covariance is used.
    pub fn use_event_met_covariance(mut self, yes: bool) -> Self {
        self.use_event_met_covariance = yes;
        self
    }

    /// Check the mass hypotheses.
    pub fn validate(&self) -> Result<()> {
        validate_mass("likelihood w_mass", self.w_mass)?;
        validate_mass("likelihood top_mass", self.top_mass)?;
        if self.w_mass >= self.top_mass {
            return Err(Error::Validation(format!(
                "likelihood w_mass ({}) must be below top_mass ({})",
                self.w_mass, self.top_mass
            )));
        }
        Ok(())
    }
}

/// Serialized form of a likelihood strategy: tables are referenced by file and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodSource {
    /// JSON table resource.
    pub tables: PathBuf,
    /// Name of the 1-D neutrino-distance table.
    pub neutrino_table: String,
    /// Name of the 2-D mass table.
    pub mass_table: String,
    /// W-boson mass hypothesis.
    #[serde(default = "default_ellipse_w_mass")]
    pub w_mass: f64,
    /// Top-quark mass hypothesis.
    #[serde(default = "default_ellipse_top_mass")]
    pub top_mass: f64,
    /// See [`LikelihoodConfig::use_event_met_covariance`].
    #[serde(default)]
    pub use_event_met_covariance: bool,
}

impl LikelihoodSource {
    /// Read the tables and build the in-memory configuration.
    pub fn load(&self) -> Result<LikelihoodConfig> {
        let set = TableSet::from_path(&self.tables)?;
        let config = LikelihoodConfig::from_table_set(&set, &self.neutrino_table, &self.mass_table)?
            .w_mass(self.w_mass)
            .top_mass(self.top_mass)
            .use_event_met_covariance(self.use_event_met_covariance);
        config.validate()?;
        Ok(config)
    }
}

/// Rank strategy selected in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Chi-squared of kinematic terms.
    Chi2(Chi2Config),
    /// Likelihood from density tables.
    Likelihood(LikelihoodSource),
}

/// Complete reconstruction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoConfig {
    /// Jet selection.
    #[serde(default)]
    pub selection: JetSelection,
    /// Optional b-tag requirement on the b candidates.
    #[serde(default)]
    pub b_tag: Option<BTagRequirement>,
    /// Rank strategy.
    pub strategy: StrategyConfig,
}

impl RecoConfig {
    /// Configuration with default selection and no b-tag requirement.
    pub fn new(strategy: StrategyConfig) -> Self {
        Self { selection: JetSelection::default(), b_tag: None, strategy }
    }

    /// Set the jet selection.
    pub fn selection(mut self, selection: JetSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the b-tag requirement.
    pub fn b_tag(mut self, requirement: BTagRequirement) -> Self {
        self.b_tag = Some(requirement);
        self
    }

    /// Parse and validate a configuration.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a configuration file.
    ///
    /// A relative likelihood table path is taken relative to the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if let StrategyConfig::Likelihood(src) = &mut config.strategy {
            if let (true, Some(dir)) = (src.tables.is_relative(), path.parent()) {
                src.tables = dir.join(&src.tables);
            }
        }
        config.validate()?;
        log::info!("loaded reconstruction config from {}", path.display());
        Ok(config)
    }

    /// Engine with the configured selection and b-tag requirement.
    pub fn build_assigner(&self) -> JetAssigner {
        let assigner = JetAssigner::new(self.selection);
        match self.b_tag {
            Some(req) => assigner.with_b_tag_requirement(req),
            None => assigner,
        }
    }

    /// Build the configured strategy, reading density tables if needed.
    ///
    /// The tables end up behind `Arc`, so clones of the returned strategy share them.
    pub fn build_strategy(&self) -> Result<AnyStrategy> {
        Ok(match &self.strategy {
            StrategyConfig::Chi2(c) => AnyStrategy::Chi2(Chi2Strategy::new(c.clone())?),
            StrategyConfig::Likelihood(src) => {
                AnyStrategy::Likelihood(LikelihoodStrategy::new(src.load()?)?)
            }
        })
    }

    /// Check everything that can be checked without reading table files.
    pub fn validate(&self) -> Result<()> {
        self.selection.validate()?;
        if let Some(req) = &self.b_tag {
            if !req.working_point.threshold.is_finite() {
                return Err(Error::Validation(format!(
                    "b-tag threshold must be finite, got {}",
                    req.working_point.threshold
                )));
            }
        }
        match &self.strategy {
            StrategyConfig::Chi2(c) => {
                c.validate()?;
                if c.terms.is_empty() {
                    return Err(Error::Validation("chi2 strategy has no terms".into()));
                }
            }
            StrategyConfig::Likelihood(src) => {
                validate_mass("likelihood w_mass", src.w_mass)?;
                validate_mass("likelihood top_mass", src.top_mass)?;
            }
        }
        Ok(())
    }
}
