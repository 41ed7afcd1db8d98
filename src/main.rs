use std::time::Duration;

use anyhow::Result;
use clap::{
    arg, crate_authors, crate_name, crate_version, value_parser, ArgAction, ArgMatches, Command,
};
use pad::PadStr;
use portwait::{
    logger,
    wait::DEFAULT_HOST,
    BudgetPolicy, Coordinator, Endpoint, WaitConfig, WaitError, WaitResult,
};

struct ParsedArgs {
    debug: bool,
    endpoints: Vec<Endpoint>,
    config: WaitConfig,
}

fn parse_args(matches: ArgMatches) -> Result<ParsedArgs, WaitError> {
    let debug = matches.get_flag("debug");

    let host = matches.get_one::<String>("host").unwrap().to_owned();

    let specs: Vec<&String> = matches.get_many::<String>("container").unwrap().collect();
    let endpoints = Endpoint::parse_all(&specs, &host)?;

    let timeout = Duration::from_secs(*matches.get_one::<u64>("timeout").unwrap());
    let workers = *matches.get_one::<usize>("threads").unwrap();
    let budget = matches.get_one::<u32>("budget").copied();
    let retry_interval = Duration::from_millis(*matches.get_one::<u64>("interval").unwrap());

    let budget_policy = if matches.get_flag("independent-budget") {
        BudgetPolicy::Independent
    } else {
        BudgetPolicy::ClampToDeadline
    };

    let config = WaitConfig {
        host,
        timeout,
        budget,
        workers,
        retry_interval,
        budget_policy,
        ..Default::default()
    };
    config.validate()?;

    Ok(ParsedArgs {
        debug,
        endpoints,
        config,
    })
}

fn print_results(result: &WaitResult) {
    let statuses = result.statuses();
    let width = statuses
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4)
        + 2;

    let mut out = format!("Wait Duration: {:.4}s\n\n", result.elapsed.as_secs_f32());
    out.push_str(&format!("{}State        Elapsed\n", "Name".pad_to_width(width)));

    statuses.iter().for_each(|s| {
        out.push_str(&format!(
            "{}{}{}s\n",
            s.name.pad_to_width(width),
            (if s.reachable { "reachable" } else { "unreachable" }).pad_to_width(13),
            s.elapsed_secs,
        ))
    });

    print!("{}", out);
}

fn cli() -> Command {
    Command::new(crate_name!())
        .about(
            "Waits until every given service accepts TCP connections.\n\
            Exits unsuccessfully if any of them isn't reachable before the timeout.",
        )
        .version(crate_version!())
        .arg_required_else_help(true)
        .author(crate_authors!())
        .args([
            arg!(-c --container <SERVICE> "Services to wait for, as name:port")
                .required(true)
                .num_args(1..)
                .value_delimiter(','),
            arg!(-m --host <HOST> "Machine where the services are running on")
                .visible_alias("machine")
                .default_value(DEFAULT_HOST),
            arg!(-t --timeout <SECS> "Timeout until the wait exits unsuccessfully")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("120"),
            arg!(-T --threads <N> "Amount of worker threads")
                .visible_alias("Threads")
                .value_parser(value_parser!(usize))
                .default_value("10"),
        ])
        .args([
            // Probe tuning.
            arg!(-b --budget <ATTEMPTS> "Connection attempts per service (defaults to the timeout)")
                .value_parser(value_parser!(u32).range(1..)),
            arg!(-i --interval <MILLIS> "Delay between two connection attempts")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("1000"),
            arg!(--"independent-budget" "Don't cap per-service attempts by the remaining timeout")
                .action(ArgAction::SetTrue),
            arg!(-d --debug "Turns on debugging information").action(ArgAction::SetTrue),
        ])
}

fn main() -> Result<()> {
    let arg_matches = cli().get_matches();

    // Extract arguments.
    let parsed = parse_args(arg_matches)?;

    logger::init(parsed.debug);

    // Wait for every endpoint.
    let result = Coordinator::new(parsed.config)?.run(&parsed.endpoints)?;

    // Show result.
    print_results(&result);

    result.into_result()?;

    Ok(())
}
