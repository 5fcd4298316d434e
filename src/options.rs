//! Settable/derived query-processing options (spec §6) and the per-variant
//! overlay mechanism (spec §9 "Option overlays").
//!
//! Parsing individual `key=value` tokens is in scope (it's how the CLI,
//! config file, and per-variant overlay all apply the same options); reading
//! option values out of a config *file* is an external concern.

use std::path::PathBuf;

use crate::error::{Error, ErrorKind, Result};

pub const EPSILON: f64 = 0.000_001;
pub const NUM_COEFFS: usize = 8;
pub const NUM_CF_COEFFS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateHandling {
    None,
    Adjacent,
    Global,
}

impl DuplicateHandling {
    fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(DuplicateHandling::None),
            1 => Ok(DuplicateHandling::Adjacent),
            2 => Ok(DuplicateHandling::Global),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("duplicate_handling must be 0, 1 or 2, got {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Off,
    CountDolm,
    IdfDolm,
    Jaccard,
    IdfJaccard,
}

impl ClassifierMode {
    fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(ClassifierMode::Off),
            1 => Ok(ClassifierMode::CountDolm),
            2 => Ok(ClassifierMode::IdfDolm),
            3 => Ok(ClassifierMode::Jaccard),
            4 => Ok(ClassifierMode::IdfJaccard),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("classifier_mode must be 0..=4, got {other}"),
            )),
        }
    }

    pub fn is_dolm(self) -> bool {
        matches!(self, ClassifierMode::CountDolm | ClassifierMode::IdfDolm)
    }

    pub fn is_idf_weighted(self) -> bool {
        matches!(self, ClassifierMode::IdfDolm | ClassifierMode::IdfJaccard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetAddressProcessing {
    None,
    StripOnly,
    StripAndEnforce,
}

impl StreetAddressProcessing {
    fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(StreetAddressProcessing::None),
            1 => Ok(StreetAddressProcessing::StripOnly),
            2 => Ok(StreetAddressProcessing::StripAndEnforce),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("street_address_processing must be 0, 1 or 2, got {other}"),
            )),
        }
    }
}

/// Per-operation-kind unit costs for the deterministic timeout budget,
/// matching the `COUNT_*` enum in the original `QBASHQ.h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpCosts {
    pub decompress: u32,
    pub skip: u32,
    pub candidate: u32,
    pub score: u32,
    pub partial: u32,
    pub rank_only: u32,
    pub term_lookup: u32,
    pub bloom: u32,
}

impl Default for OpCosts {
    fn default() -> Self {
        OpCosts {
            decompress: 1,
            skip: 1,
            candidate: 1,
            score: 2,
            partial: 3,
            rank_only: 2,
            term_lookup: 4,
            bloom: 1,
        }
    }
}

/// File locations for the four mandatory index files plus the two optional
/// rule files. `index_dir` is mutually exclusive with setting any of the
/// individual paths (spec §6).
#[derive(Debug, Clone, Default)]
pub struct FilePaths {
    pub index_dir: Option<PathBuf>,
    pub forward: Option<PathBuf>,
    pub inverted: Option<PathBuf>,
    pub vocab: Option<PathBuf>,
    pub doctable: Option<PathBuf>,
    pub substitution_rules: Option<PathBuf>,
    pub segment_rules: Option<PathBuf>,
    pub query_batch: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl FilePaths {
    /// Resolve one of the four mandatory files, honoring `index_dir` when
    /// the individual path wasn't set.
    pub fn resolve(&self, individual: &Option<PathBuf>, stem_suffix: &str) -> Result<PathBuf> {
        if let Some(p) = individual {
            if self.index_dir.is_some() {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    "index_dir is mutually exclusive with individual file paths",
                ));
            }
            return Ok(p.clone());
        }
        if let Some(dir) = &self.index_dir {
            return Ok(dir.join(format!("QBASH.{stem_suffix}")));
        }
        Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("no path given for QBASH.{stem_suffix} (set index_dir or the individual path)"),
        ))
    }
}

/// All settable and derived query-processing options, equivalent to
/// `query_processing_environment_t` minus the statistics/runtime fields
/// (those live on [`crate::engine::QueryEngine`] instead).
#[derive(Debug, Clone)]
pub struct Options {
    pub files: FilePaths,
    pub pq: Option<String>,

    pub max_to_show: usize,
    pub max_candidates: usize,
    pub max_length_diff: i32,
    pub timeout_kops: u64,
    pub timeout_msec: u64,

    /// alpha..theta, normalized to sum to 1 by [`Options::normalize`].
    pub rr_coeffs: [f64; NUM_COEFFS],
    /// chi, psi, omega.
    pub cf_coeffs: [f64; NUM_CF_COEFFS],

    pub auto_partials: bool,
    pub auto_line_prefix: bool,
    pub warm_indexes: bool,
    pub relaxation_level: u8,
    pub display_col: i32,
    pub extracol: i32,
    pub query_streams: usize,
    pub duplicate_handling: DuplicateHandling,

    pub classifier_mode: ClassifierMode,
    pub classifier_threshold: f64,
    pub classifier_min_words: usize,
    pub classifier_max_words: usize,
    pub classifier_stop_thresh1: f64,
    pub classifier_stop_thresh2: f64,
    pub segment_intent_multiplier: f64,
    pub classifier_segment: Option<String>,

    pub use_substitutions: bool,
    pub language: Option<String>,
    pub conflate_accents: bool,

    pub location_lat: Option<f64>,
    pub location_long: Option<f64>,
    pub geo_filter_radius: Option<f64>,

    pub street_address_processing: StreetAddressProcessing,
    pub street_specs_col: i32,

    pub query_shortening_threshold: usize,
    pub x_max_span_length: usize,

    pub debug: i32,
    pub chatty: bool,
    pub display_parsed_query: bool,
    pub x_show_qtimes: bool,
    pub x_batch_testing: bool,
    pub allow_per_query_options: bool,

    pub op_costs: OpCosts,

    // ---- derived, recomputed by `normalize()`.
    pub scoring_needed: bool,
    pub report_match_counts_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        let mut o = Options {
            files: FilePaths::default(),
            pq: None,
            max_to_show: 10,
            max_candidates: 1000,
            max_length_diff: 100, // auto-scaling, see `Options::max_length_diff_for`
            timeout_kops: 0,      // 0 == unlimited
            timeout_msec: 0,
            rr_coeffs: [1.0; NUM_COEFFS],
            cf_coeffs: [1.0; NUM_CF_COEFFS],
            auto_partials: false,
            auto_line_prefix: false,
            warm_indexes: false,
            relaxation_level: 0,
            display_col: 0,
            extracol: 0,
            query_streams: num_cpus::get().max(1),
            duplicate_handling: DuplicateHandling::Adjacent,
            classifier_mode: ClassifierMode::Off,
            classifier_threshold: 0.0,
            classifier_min_words: 1,
            classifier_max_words: MAX_CLASSIFIER_WORDS,
            classifier_stop_thresh1: f64::INFINITY,
            classifier_stop_thresh2: f64::INFINITY,
            segment_intent_multiplier: 1.0,
            classifier_segment: None,
            use_substitutions: false,
            language: None,
            conflate_accents: false,
            location_lat: None,
            location_long: None,
            geo_filter_radius: None,
            street_address_processing: StreetAddressProcessing::None,
            street_specs_col: -1,
            query_shortening_threshold: usize::MAX,
            x_max_span_length: 5,
            debug: 0,
            chatty: false,
            display_parsed_query: false,
            x_show_qtimes: false,
            x_batch_testing: false,
            allow_per_query_options: true,
            op_costs: OpCosts::default(),
            scoring_needed: true,
            report_match_counts_only: false,
        };
        o.normalize();
        o
    }
}

const MAX_CLASSIFIER_WORDS: usize = 32;

impl Options {
    /// Normalize `rr_coeffs` to sum to 1 and recompute `scoring_needed`
    /// (true iff any non-`static` coefficient exceeds [`EPSILON`]) and
    /// `report_match_counts_only` (true iff `max_to_show == 0`), per
    /// spec §8's testable property.
    pub fn normalize(&mut self) {
        let sum: f64 = self.rr_coeffs.iter().sum();
        if sum.abs() > EPSILON {
            for c in &mut self.rr_coeffs {
                *c /= sum;
            }
        }
        self.scoring_needed = self.rr_coeffs[1..].iter().any(|c| c.abs() > EPSILON);
        self.report_match_counts_only = self.max_to_show == 0;
    }

    /// Parse one `-key=value` or `key=value` token and apply it, mirroring
    /// `assign_one_arg()` in the original `arg_parser.c`. Unknown keys are a
    /// [`ErrorKind::InvalidArgument`] error, not silently ignored, since a
    /// typo'd per-variant override should not pass silently.
    pub fn apply_arg(&mut self, arg: &str) -> Result<()> {
        let arg = arg.strip_prefix('-').unwrap_or(arg);
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            Error::new(ErrorKind::Parse, format!("option '{arg}' is not key=value"))
        })?;

        macro_rules! parse_num {
            ($t:ty) => {
                value
                    .parse::<$t>()
                    .map_err(|_| Error::new(ErrorKind::InvalidArgument, format!("bad value for {key}: {value}")))?
            };
        }
        macro_rules! parse_bool {
            () => {
                match value {
                    "1" | "true" | "TRUE" | "yes" => true,
                    "0" | "false" | "FALSE" | "no" => false,
                    _ => {
                        return Err(Error::new(
                            ErrorKind::InvalidArgument,
                            format!("bad boolean for {key}: {value}"),
                        ))
                    }
                }
            };
        }

        match key {
            "index_dir" => self.files.index_dir = Some(PathBuf::from(value)),
            "file_forward" => self.files.forward = Some(PathBuf::from(value)),
            "file_if" => self.files.inverted = Some(PathBuf::from(value)),
            "file_vocab" => self.files.vocab = Some(PathBuf::from(value)),
            "file_doctable" => self.files.doctable = Some(PathBuf::from(value)),
            "file_substitution_rules" => self.files.substitution_rules = Some(PathBuf::from(value)),
            "file_segment_rules" => self.files.segment_rules = Some(PathBuf::from(value)),
            "file_query_batch" => self.files.query_batch = Some(PathBuf::from(value)),
            "file_output" => self.files.output = Some(PathBuf::from(value)),
            "file_config" => self.files.config = Some(PathBuf::from(value)),
            "pq" => self.pq = Some(value.to_string()),
            "max_to_show" => self.max_to_show = parse_num!(usize),
            "max_candidates" => self.max_candidates = parse_num!(usize),
            "max_length_diff" => self.max_length_diff = parse_num!(i32),
            "timeout_kops" => self.timeout_kops = parse_num!(u64),
            "timeout_msec" => self.timeout_msec = parse_num!(u64),
            "alpha" => self.rr_coeffs[0] = parse_num!(f64),
            "beta" => self.rr_coeffs[1] = parse_num!(f64),
            "gamma" => self.rr_coeffs[2] = parse_num!(f64),
            "delta" => self.rr_coeffs[3] = parse_num!(f64),
            "epsilon" => self.rr_coeffs[4] = parse_num!(f64),
            "zeta" => self.rr_coeffs[5] = parse_num!(f64),
            "eta" => self.rr_coeffs[6] = parse_num!(f64),
            "theta" => self.rr_coeffs[7] = parse_num!(f64),
            "chi" => self.cf_coeffs[0] = parse_num!(f64),
            "psi" => self.cf_coeffs[1] = parse_num!(f64),
            "omega" => self.cf_coeffs[2] = parse_num!(f64),
            "auto_partials" => self.auto_partials = parse_bool!(),
            "auto_line_prefix" => self.auto_line_prefix = parse_bool!(),
            "warm_indexes" => self.warm_indexes = parse_bool!(),
            "relaxation_level" => {
                let v = parse_num!(u8);
                if v as usize > crate::types::MAX_RELAX {
                    return Err(Error::new(
                        ErrorKind::InvalidArgument,
                        format!("relaxation_level must be 0..={}", crate::types::MAX_RELAX),
                    ));
                }
                self.relaxation_level = v;
            }
            "display_col" => self.display_col = parse_num!(i32),
            "extracol" => self.extracol = parse_num!(i32),
            "query_streams" => self.query_streams = parse_num!(usize).max(1),
            "duplicate_handling" => self.duplicate_handling = DuplicateHandling::from_code(parse_num!(i64))?,
            "classifier_mode" => self.classifier_mode = ClassifierMode::from_code(parse_num!(i64))?,
            "classifier_threshold" => self.classifier_threshold = parse_num!(f64),
            "classifier_min_words" => self.classifier_min_words = parse_num!(usize),
            "classifier_max_words" => self.classifier_max_words = parse_num!(usize),
            "classifier_stop_thresh1" => self.classifier_stop_thresh1 = parse_num!(f64),
            "classifier_stop_thresh2" => self.classifier_stop_thresh2 = parse_num!(f64),
            "segment_intent_multiplier" => self.segment_intent_multiplier = parse_num!(f64),
            "classifier_segment" => self.classifier_segment = Some(value.to_string()),
            "use_substitutions" => self.use_substitutions = parse_bool!(),
            "language" => self.language = Some(value.to_string()),
            "conflate_accents" => self.conflate_accents = parse_bool!(),
            "location_lat" => self.location_lat = Some(parse_num!(f64)),
            "location_long" => self.location_long = Some(parse_num!(f64)),
            "geo_filter_radius" => self.geo_filter_radius = Some(parse_num!(f64)),
            "street_address_processing" => {
                self.street_address_processing = StreetAddressProcessing::from_code(parse_num!(i64))?
            }
            "street_specs_col" => self.street_specs_col = parse_num!(i32),
            "query_shortening_threshold" => self.query_shortening_threshold = parse_num!(usize),
            "x_max_span_length" => self.x_max_span_length = parse_num!(usize),
            "debug" => self.debug = parse_num!(i32),
            "chatty" => self.chatty = parse_bool!(),
            "display_parsed_query" => self.display_parsed_query = parse_bool!(),
            "x_show_qtimes" => self.x_show_qtimes = parse_bool!(),
            "x_batch_testing" => self.x_batch_testing = parse_bool!(),
            "allow_per_query_options" => self.allow_per_query_options = parse_bool!(),
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("unrecognized option '{other}'"),
                ))
            }
        }
        self.normalize();
        Ok(())
    }

    /// Effective `max_length_diff` given a query length `l`, resolving the
    /// auto-scaling schema left open by spec §9's Open Question: values
    /// `>= 100` are treated as an auto-scaling request and decoded as
    /// `addon = value % 100`, `relaxation_bonus = (value / 100) % 10`; the
    /// formula `l*l/(l+2) + relaxation + addon` is then used. Values below
    /// 100 are used as a literal, unconditional bound. This keeps the
    /// literal/auto ranges disjoint rather than overlapping, per the Open
    /// Question (decision recorded in DESIGN.md).
    pub fn max_length_diff_for(&self, query_len: usize, relaxation: u8) -> i32 {
        if self.max_length_diff < 100 {
            return self.max_length_diff;
        }
        let addon = self.max_length_diff % 100;
        let l = query_len as f64;
        let formula = l * l / (l + 2.0) + relaxation as f64 + addon as f64;
        formula.round() as i32
    }

    /// Build an effective, per-variant view by starting from `self` and
    /// applying only the overrides parsed from `overrides`, without
    /// mutating `self`. Matches the "Option overlays" design note: the
    /// overlay is a plain clone-then-patch, discarded at variant end.
    pub fn overlay(&self, overrides: &str) -> Result<Options> {
        let mut clone = self.clone();
        for token in overrides.split_whitespace().filter(|t| !t.is_empty()) {
            clone.apply_arg(token)?;
        }
        Ok(clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_coeffs_normalize_to_one() {
        let o = Options::default();
        let sum: f64 = o.rr_coeffs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scoring_needed_false_when_only_static_weighted() {
        let mut o = Options::default();
        o.rr_coeffs = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        o.normalize();
        assert!(!o.scoring_needed);
    }

    #[test]
    fn overlay_does_not_mutate_base() {
        let base = Options::default();
        let overlaid = base.overlay("max_to_show=5").unwrap();
        assert_eq!(base.max_to_show, 10);
        assert_eq!(overlaid.max_to_show, 5);
    }

    #[test]
    fn max_length_diff_literal_below_100_is_unconditional() {
        let mut o = Options::default();
        o.max_length_diff = 3;
        assert_eq!(o.max_length_diff_for(4, 0), 3);
        assert_eq!(o.max_length_diff_for(100, 2), 3);
    }

    #[test]
    fn max_length_diff_auto_scales_with_query_length() {
        let mut o = Options::default();
        o.max_length_diff = 402; // auto, addon=2
        let short = o.max_length_diff_for(1, 0);
        let long = o.max_length_diff_for(10, 0);
        assert!(long > short);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut o = Options::default();
        assert!(o.apply_arg("not_a_real_option=1").is_err());
    }

    #[test]
    fn index_dir_conflicts_with_individual_path() {
        let mut o = Options::default();
        o.files.forward = Some(PathBuf::from("/tmp/x.forward"));
        o.files.index_dir = Some(PathBuf::from("/tmp"));
        assert!(o.files.resolve(&o.files.forward.clone(), "forward").is_err());
    }
}
