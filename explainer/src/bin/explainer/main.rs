mod gcnf;
mod instance;
mod os_signal_termination;
mod result;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::ValueEnum;
use explainer::core::convert_case::Case;
use explainer::core::explanations::ConflictExtractor;
use explainer::core::explanations::ConflictSource;
use explainer::core::explanations::ConsoleChoice;
use explainer::core::explanations::CorrectionSetOptimizer;
use explainer::core::explanations::DiagnosisResult;
use explainer::core::explanations::DiagnosisSession;
use explainer::core::explanations::HittingSetOptimizer;
use explainer::core::explanations::LatticeSubset;
use explainer::core::explanations::SubsetMapper;
use explainer::core::options::CorrectionStrategy;
use explainer::core::options::ExtractorOptions;
use explainer::core::options::HittingSetOptions;
use explainer::core::options::ShrinkOrder;
use explainer::core::statistics::configure_statistic_logging;
use explainer::core::statistics::log_statistic_postfix;
use explainer::core::statistics::StatisticLogger;
use explainer::core::termination::Combinator;
use explainer::core::termination::TerminationCondition;
use explainer::core::termination::TimeBudget;
use explainer::core::termination::Triggered;
use explainer::core::variables::Indicator;
use explainer::core::ExplanationError;
use explainer::oracles::ClauseOracle;
use explainer::oracles::FiniteDomainOracle;
use explainer::stepwise::StepwiseError;
use explainer::stepwise::StepwiseExplainer;
use gcnf::parse_gcnf;
use instance::Groups;
use instance::Instance;
use log::error;
use log::info;
use log::warn;
use log::Level;
use log::LevelFilter;
use os_signal_termination::OsSignal;
use result::ExplainerError;
use result::ExplainerResult;

#[derive(Debug, Parser)]
#[command(
    help_template = "\
{before-help}{name} {version}
Authors: {author}
About: {about}

{usage-heading}\n{tab}{usage}

{all-args}{after-help}
",
    author,
    version,
    about,
    arg_required_else_help = true
)]
struct Args {
    /// The instance to explain. The file should have one of the following extensions:
    ///  - '*.gcnf' for group-oriented CNF, where every group other than group 0 is one soft
    ///    constraint and group 0 holds the hard clauses,
    ///  - '*.cnf' for DIMACS CNF, where every clause is a soft constraint of its own, numbered
    ///    from 1 in file order.
    #[clap(verbatim_doc_comment)]
    instance_path: PathBuf,

    /// What to compute. Subsets are printed as the numbers of their groups, one line per subset,
    /// e.g. "MUS: 1 4".
    ///  - 'mus': a minimal unsatisfiable subset,
    ///  - 'mss': a maximal satisfiable subset,
    ///  - 'mcs': a minimal correction subset,
    ///  - 'enumerate': all minimal unsatisfiable and maximal satisfiable subsets,
    ///  - 'optimal-mus': an unsatisfiable subset of minimum weight,
    ///  - 'optimal-mcs': a correction subset of minimum weight,
    ///  - 'diagnose': interactively removes groups from minimal unsatisfiable subsets until the
    ///    instance is satisfiable,
    ///  - 'diagnose-optimal': like 'diagnose', presenting unsatisfiable subsets of minimum weight,
    ///  - 'steps': a sequence of small inference steps which ends in a conflict, one line per step,
    ///    e.g. "STEP: 2 | x1 != 0, x2 != 1 => false".
    #[arg(short = 'm', long = "mode", value_enum, default_value_t, verbatim_doc_comment)]
    mode: Mode,

    /// The weights of the groups, in ascending group order, separated by commas. Only used by the
    /// optimal modes; by default every group has weight 1.
    ///
    /// Possible values: u64 list (Optional)
    #[arg(long = "weights", value_delimiter = ',', verbatim_doc_comment)]
    weights: Vec<u64>,

    /// Restricts the optimal unsatisfiable subsets to contain exactly one of the given groups,
    /// separated by commas.
    ///
    /// Possible values: u32 list (Optional)
    #[arg(long = "one-of", value_delimiter = ',', verbatim_doc_comment)]
    one_of: Vec<u32>,

    /// The order in which groups are considered when shrinking and growing subsets.
    #[arg(long = "shrink-order", value_enum, default_value_t)]
    shrink_order: ShrinkOrder,

    /// How correction subsets are derived while searching for optimal unsatisfiable subsets.
    #[arg(long = "correction-strategy", value_enum, default_value_t)]
    correction_strategy: CorrectionStrategy,

    /// Disables the cache of feasibility checks.
    ///
    /// Possible values: bool
    #[arg(long = "no-cache", verbatim_doc_comment)]
    no_cache: bool,

    /// The time budget for the explanation, given in milliseconds. When it is exhausted, "UNKNOWN"
    /// is printed.
    ///
    /// Possible values: u64 (Optional)
    #[arg(short = 't', long = "time-limit", verbatim_doc_comment)]
    time_limit: Option<u64>,

    /// The random seed used for the shuffled shrink order.
    ///
    /// Possible values: u64
    #[arg(
        short = 'r',
        long = "random-seed",
        default_value_t = 42,
        verbatim_doc_comment
    )]
    random_seed: u64,

    /// Enables log message output.
    ///
    /// Possible values: bool
    #[arg(short = 'v', long = "verbose", verbatim_doc_comment)]
    verbose: bool,

    /// Enables logging of statistics.
    ///
    /// Possible values: bool
    #[arg(short = 's', long = "log-statistics", verbatim_doc_comment)]
    log_statistics: bool,

    /// If `--verbose` is enabled then this option removes the timestamp information from the log
    /// messages.
    ///
    /// Possible values: bool
    #[arg(long = "omit-timestamp", verbatim_doc_comment)]
    omit_timestamp: bool,

    /// If `--verbose` is enabled then this option removes the call site information from the log
    /// messages. The call site is the file and line from which the message originated.
    ///
    /// Possible values: bool
    #[arg(long = "omit-call-site", default_value_t = false, verbatim_doc_comment)]
    omit_call_site: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Mode {
    #[default]
    Mus,
    Mss,
    Mcs,
    Enumerate,
    OptimalMus,
    OptimalMcs,
    Diagnose,
    DiagnoseOptimal,
    Steps,
}

fn configure_logging(
    verbose: bool,
    log_statistics: bool,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    if log_statistics {
        configure_statistic_logging("c STAT", None, Some(Case::Camel), None);
    }

    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if record.level() != Level::Info && !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if record.level() != Level::Info && !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .target(env_logger::Target::Stdout)
        .init();
    info!("Logging successfully configured");
    Ok(())
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {e}");
            std::process::exit(1);
        }
    }
}

fn run() -> ExplainerResult<()> {
    let args = Args::parse();

    configure_logging(
        args.verbose,
        args.log_statistics,
        args.omit_timestamp,
        args.omit_call_site,
    )?;

    if explainer::core::asserts::EXPLAINER_ASSERT_LEVEL_DEFINITION
        >= explainer::core::asserts::EXPLAINER_ASSERT_MODERATE
    {
        warn!(
            "Potential performance degradation: the explainer assert level is set to {}, meaning many debug asserts are active which may result in performance degradation.",
            explainer::core::asserts::EXPLAINER_ASSERT_LEVEL_DEFINITION
        );
    };

    let instance = Instance::new(parse_gcnf(File::open(&args.instance_path)?)?);
    info!(
        "Read an instance with {} hard constraints and {} groups",
        instance.hard_constraints.len(),
        instance.groups.len()
    );

    let weights = if args.weights.is_empty() {
        vec![1; instance.groups.len()]
    } else if args.weights.len() == instance.groups.len() {
        args.weights.clone()
    } else {
        return Err(ExplainerError::InvalidWeights {
            expected: instance.groups.len(),
            given: args.weights.len(),
        });
    };

    let one_of = args
        .one_of
        .iter()
        .map(|&group| instance.groups.indicator(group))
        .collect::<ExplainerResult<Vec<_>>>()?;

    let options = ExtractorOptions {
        shrink_order: args.shrink_order,
        random_seed: args.random_seed,
        use_cache: !args.no_cache,
    };

    let signal = OsSignal::install();
    let time_limit = args.time_limit.map(Duration::from_millis);
    let mut termination = Combinator::new(
        signal.clone(),
        time_limit.map(TimeBudget::starting_now),
    );

    let outcome = match args.mode {
        Mode::Steps => steps(instance, &mut termination),
        mode => subsets(
            mode,
            instance,
            weights,
            &one_of,
            options,
            args.correction_strategy,
            &mut termination,
        ),
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(ExplanationError::Timeout) => {
            match (termination.triggered(), signal.received()) {
                (Some(Triggered::First), Some(number)) => info!("Stopped by signal {number}"),
                (Some(Triggered::Second), _) => info!("The time limit was exhausted"),
                _ => {}
            }
            println!("UNKNOWN");
            Ok(())
        }
        Err(ExplanationError::NoConflict) => {
            println!("SATISFIABLE");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn subsets(
    mode: Mode,
    instance: Instance,
    weights: Vec<u64>,
    one_of: &[Indicator],
    options: ExtractorOptions,
    correction_strategy: CorrectionStrategy,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let Instance {
        oracle,
        hard_constraints,
        soft_constraints,
        groups,
        ..
    } = instance;
    let extractor = ConflictExtractor::new(oracle, hard_constraints, soft_constraints, options)?;

    match mode {
        Mode::Enumerate => enumerate(extractor, &groups, termination),
        Mode::OptimalMus => {
            let mut optimizer = HittingSetOptimizer::new(
                ClauseOracle::default(),
                weights,
                HittingSetOptions {
                    correction_strategy,
                },
            );
            if !one_of.is_empty() {
                optimizer.exactly_one_of(one_of);
            }
            optimal_mus(optimizer, extractor, &groups, termination)
        }
        Mode::OptimalMcs => {
            let optimizer = CorrectionSetOptimizer::new(ClauseOracle::default(), weights);
            optimal_mcs(optimizer, extractor, &groups, termination)
        }
        Mode::Diagnose => {
            let session = DiagnosisSession::basic(extractor);
            diagnose(session, &groups, termination)
        }
        Mode::DiagnoseOptimal => {
            let optimizer = HittingSetOptimizer::new(
                ClauseOracle::default(),
                weights,
                HittingSetOptions {
                    correction_strategy,
                },
            );
            let session = DiagnosisSession::optimal(extractor, optimizer);
            diagnose(session, &groups, termination)
        }
        _ => single_subset(mode, extractor, &groups, termination),
    }
}

fn log_statistics(log: impl FnOnce(StatisticLogger)) {
    log(StatisticLogger::new(["explainer"]));
    log_statistic_postfix();
}

fn all_indicators(extractor: &ConflictExtractor<FiniteDomainOracle>) -> Vec<Indicator> {
    extractor.model().indicators().collect()
}

/// An empty unsatisfiable subset means the hard constraints alone are infeasible.
fn non_empty_conflict(conflict: Vec<Indicator>) -> Result<Vec<Indicator>, ExplanationError> {
    if conflict.is_empty() {
        Err(ExplanationError::HardConstraintsInfeasible)
    } else {
        Ok(conflict)
    }
}

fn single_subset(
    mode: Mode,
    mut extractor: ConflictExtractor<FiniteDomainOracle>,
    groups: &Groups,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let result = match mode {
        Mode::Mus => {
            let all = all_indicators(&extractor);
            extractor
                .shrink(&all, termination)
                .and_then(non_empty_conflict)
                .map(|conflict| groups.format("MUS", &conflict))
        }
        Mode::Mss => extractor
            .grow(&[], termination)
            .map(|satisfiable| groups.format("MSS", &satisfiable)),
        _ => extractor
            .minimal_correction_subset(&[], termination)
            .map(|correction| groups.format("MCS", &correction)),
    };

    log_statistics(|logger| {
        extractor.log_statistics(logger.attach_to_prefix("extractor"));
        extractor
            .oracle()
            .log_statistics(logger.attach_to_prefix("oracle"));
    });

    println!("{}", result?);
    Ok(())
}

fn enumerate(
    extractor: ConflictExtractor<FiniteDomainOracle>,
    groups: &Groups,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let mut mapper = SubsetMapper::new(extractor, ClauseOracle::default());

    let result = loop {
        match mapper.next_subset(termination) {
            Ok(Some(LatticeSubset::Mus(conflict))) => match non_empty_conflict(conflict) {
                Ok(conflict) => println!("{}", groups.format("MUS", &conflict)),
                Err(e) => break Err(e),
            },
            Ok(Some(LatticeSubset::Mss(satisfiable))) => {
                println!("{}", groups.format("MSS", &satisfiable));
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    log_statistics(|logger| mapper.log_statistics(logger));

    result
}

fn optimal_mus(
    mut optimizer: HittingSetOptimizer<ClauseOracle>,
    mut extractor: ConflictExtractor<FiniteDomainOracle>,
    groups: &Groups,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let result = optimizer.optimal_mus(&mut extractor, termination);

    log_statistics(|logger| {
        optimizer.log_statistics(logger.attach_to_prefix("hitting_set"));
        extractor.log_statistics(logger.attach_to_prefix("extractor"));
    });

    let conflict = result.and_then(non_empty_conflict)?;
    info!("The unsatisfiable subset has weight {}", optimizer.weight(&conflict));
    println!("{}", groups.format("MUS", &conflict));
    Ok(())
}

fn optimal_mcs(
    mut optimizer: CorrectionSetOptimizer<ClauseOracle>,
    mut extractor: ConflictExtractor<FiniteDomainOracle>,
    groups: &Groups,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let result = optimizer.optimal_correction_subset(&mut extractor, termination);

    log_statistics(|logger| {
        optimizer.log_statistics(logger.attach_to_prefix("correction_set"));
        extractor.log_statistics(logger.attach_to_prefix("extractor"));
    });

    let correction = result?;
    info!("The correction subset has weight {}", optimizer.weight(&correction));
    println!("{}", groups.format("MCS", &correction));
    Ok(())
}

fn diagnose<S: ConflictSource<FiniteDomainOracle>>(
    mut session: DiagnosisSession<FiniteDomainOracle, S>,
    groups: &Groups,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let result = session.run(&mut ConsoleChoice::stdio(), termination);

    log_statistics(|logger| session.log_statistics(logger));

    println!("{}", groups.format("REMOVED", session.removed()));
    match result {
        DiagnosisResult::Feasible { .. } => println!("FEASIBLE"),
        DiagnosisResult::Aborted { .. } => println!("ABORTED"),
        DiagnosisResult::Failed { error, .. } => return Err(error),
    }

    Ok(())
}

/// Explains why the instance is unsatisfiable step by step. Every line lists the groups of a
/// step, with 0 for the hard clauses, e.g. "STEP: 2 | x1 != 0, x2 != 1 => false".
fn steps(
    instance: Instance,
    termination: &mut impl TerminationCondition,
) -> Result<(), ExplanationError> {
    let Instance {
        oracle,
        variables,
        hard_constraints,
        soft_constraints,
        groups,
    } = instance;

    let labels = hard_constraints
        .iter()
        .map(|_| 0)
        .chain((0..groups.len()).map(|index| groups.number(index)))
        .collect::<Vec<_>>();
    let constraints = hard_constraints
        .into_iter()
        .chain(soft_constraints)
        .collect();

    let mut explainer = StepwiseExplainer::new(oracle, variables, constraints)?;
    let goal = explainer.conflict_goal();
    let result = explainer.find_sequence(&goal, termination);

    log_statistics(|logger| explainer.log_statistics(logger));

    let steps = match result {
        Ok(steps) => steps,
        Err(StepwiseError::Stuck { remaining }) => {
            info!("No step removes any of the {remaining} remaining values");
            return Err(ExplanationError::NoConflict);
        }
        Err(StepwiseError::Explanation(error)) => return Err(error),
    };

    for step in steps {
        let mut numbers = step
            .constraints
            .iter()
            .map(|&index| labels[index])
            .collect::<Vec<_>>();
        numbers.sort_unstable();
        numbers.dedup();

        let numbers = numbers
            .iter()
            .map(|number| number.to_string())
            .collect::<Vec<_>>();
        println!("STEP: {} | {step}", numbers.join(" "));
    }
    Ok(())
}
