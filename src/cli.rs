//! Command line surface.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::{
    blocked_dates::{parse_weekdays, BlockedDateSelection},
    db::MoveDirection,
};

pub const DEFAULT_DATA_DIR: &str = "./.seminar-desk";
const DEFAULT_HISTORY_LIMIT: usize = 20;

const DATA_DIR_ARG: &str = "data-dir";
const FROM_ARG: &str = "from";
const TO_ARG: &str = "to";
const ID_ARG: &str = "id";
const IDS_ARG: &str = "ids";
const NAME_ARG: &str = "name";
const COLOR_ARG: &str = "color";
const STAFF_ARG: &str = "staff";
const SEMINAR_ARG: &str = "seminar-id";
const DIRECTION_ARG: &str = "direction";
const LIMIT_ARG: &str = "limit";
const DATE_ARG: &str = "date";
const DATES_ARG: &str = "dates";
const WEEKDAYS_ARG: &str = "weekdays";
const REASON_ARG: &str = "reason";
const KEY_ARG: &str = "key";
const VALUE_ARG: &str = "value";
const YES_ARG: &str = "yes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    SyncRun,
    SyncWatch,
    SyncHistory {
        limit: usize,
    },
    SeminarsList {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    SeminarsAssign {
        seminar_id: String,
        staff_id: Option<i64>,
    },
    SeminarsSchedule {
        from: NaiveDate,
        to: NaiveDate,
    },
    StaffList,
    StaffAdd {
        name: String,
        color: Option<String>,
    },
    StaffUpdate {
        id: i64,
        name: Option<String>,
        color: Option<String>,
    },
    StaffRemove {
        id: i64,
    },
    StaffMove {
        id: i64,
        direction: MoveDirection,
    },
    StaffNextColor,
    BlockedList {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    BlockedAdd {
        selection: BlockedDateSelection,
        staff_id: Option<i64>,
        reason: Option<String>,
    },
    BlockedRemove {
        ids: Vec<i64>,
    },
    BlockedClear,
    ConfigShow,
    ConfigSet {
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub data_dir: PathBuf,
    pub command: CliCommand,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a date in YYYY-MM-DD form"))
}

fn date_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .num_args(1)
        .value_parser(parse_date_arg)
        .help(help)
}

fn range_args(cmd: Command, required: bool) -> Command {
    cmd.arg(date_arg(FROM_ARG, "First day, YYYY-MM-DD").required(required))
        .arg(date_arg(TO_ARG, "Last day (inclusive), YYYY-MM-DD").required(required))
}

pub fn build_cli() -> Command {
    let staff_id_arg = Arg::new(ID_ARG)
        .help("Staff id")
        .num_args(1)
        .value_parser(value_parser!(i64))
        .required(true);

    Command::new("seminar-desk")
        .about("Keeps a local copy of the seminar listing and plans staff around it")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(DATA_DIR_ARG)
                .long(DATA_DIR_ARG)
                .help("Directory holding settings and the database")
                .num_args(1)
                .global(true)
                .default_value(DEFAULT_DATA_DIR),
        )
        .subcommand(
            Command::new("sync")
                .about("Scrape the booking site and reconcile the local seminars")
                .subcommand_required(true)
                .subcommand(Command::new("run").about("Run one sync and print the result"))
                .subcommand(Command::new("watch").about("Sync periodically until interrupted"))
                .subcommand(
                    Command::new("history").about("Show recent sync runs").arg(
                        Arg::new(LIMIT_ARG)
                            .long(LIMIT_ARG)
                            .num_args(1)
                            .value_parser(value_parser!(usize))
                            .default_value("20"),
                    ),
                ),
        )
        .subcommand(
            Command::new("seminars")
                .about("Seminar listing and staff assignment")
                .subcommand_required(true)
                .subcommand(range_args(
                    Command::new("list").about("List active seminars with their staff"),
                    false,
                ))
                .subcommand(
                    Command::new("assign")
                        .about("Assign a staff member to a seminar; without --staff the assignment is cleared")
                        .arg(Arg::new(SEMINAR_ARG).num_args(1).required(true))
                        .arg(
                            Arg::new(STAFF_ARG)
                                .long(STAFF_ARG)
                                .num_args(1)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(range_args(
                    Command::new("schedule").about("Per-day seminars and blocked staff"),
                    true,
                )),
        )
        .subcommand(
            Command::new("staff")
                .about("Manage staff")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List staff in display order"))
                .subcommand(
                    Command::new("add")
                        .about("Add a staff member")
                        .arg(Arg::new(NAME_ARG).num_args(1).required(true))
                        .arg(
                            Arg::new(COLOR_ARG)
                                .long(COLOR_ARG)
                                .num_args(1)
                                .help("Theme colour #RRGGBB; defaults to the next free palette colour"),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .about("Rename a staff member or change their colour")
                        .arg(staff_id_arg.clone())
                        .arg(Arg::new(NAME_ARG).long(NAME_ARG).num_args(1))
                        .arg(Arg::new(COLOR_ARG).long(COLOR_ARG).num_args(1)),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Delete a staff member")
                        .arg(staff_id_arg.clone()),
                )
                .subcommand(
                    Command::new("move")
                        .about("Move a staff member up or down in the display order")
                        .arg(staff_id_arg)
                        .arg(
                            Arg::new(DIRECTION_ARG)
                                .num_args(1)
                                .value_parser(["up", "down"])
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("next-color").about("Show the colour a new staff member would get"),
                ),
        )
        .subcommand(
            Command::new("blocked")
                .about("Days on which staff cannot work")
                .subcommand_required(true)
                .subcommand(range_args(
                    Command::new("list").about("List blocked dates"),
                    false,
                ))
                .subcommand(
                    Command::new("add")
                        .about("Block one date, a list, a range, or weekdays within a range")
                        .arg(
                            date_arg(DATE_ARG, "Single date")
                                .conflicts_with_all([DATES_ARG, FROM_ARG]),
                        )
                        .arg(
                            Arg::new(DATES_ARG)
                                .long(DATES_ARG)
                                .num_args(1..)
                                .value_delimiter(',')
                                .value_parser(parse_date_arg)
                                .conflicts_with(FROM_ARG)
                                .help("Comma separated dates"),
                        )
                        .arg(date_arg(FROM_ARG, "Range start").requires(TO_ARG))
                        .arg(date_arg(TO_ARG, "Range end (inclusive)").requires(FROM_ARG))
                        .arg(
                            Arg::new(WEEKDAYS_ARG)
                                .long(WEEKDAYS_ARG)
                                .num_args(1)
                                .requires(FROM_ARG)
                                .help("Only these weekdays in the range, e.g. mon,thu"),
                        )
                        .arg(
                            Arg::new(STAFF_ARG)
                                .long(STAFF_ARG)
                                .num_args(1)
                                .value_parser(value_parser!(i64))
                                .help("Block for this staff member only; default is everyone"),
                        )
                        .arg(Arg::new(REASON_ARG).long(REASON_ARG).num_args(1)),
                )
                .subcommand(
                    Command::new("remove").about("Delete blocked dates by id").arg(
                        Arg::new(IDS_ARG)
                            .num_args(1..)
                            .value_parser(value_parser!(i64))
                            .required(true),
                    ),
                )
                .subcommand(
                    Command::new("clear").about("Delete every blocked date").arg(
                        Arg::new(YES_ARG)
                            .long(YES_ARG)
                            .action(ArgAction::SetTrue)
                            .help("Confirm deleting everything"),
                    ),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change settings")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the current settings"))
                .subcommand(
                    Command::new("set")
                        .about("Set one key, e.g. sync.deletion_mode soft")
                        .arg(Arg::new(KEY_ARG).num_args(1).required(true))
                        .arg(Arg::new(VALUE_ARG).num_args(1).required(true)),
                ),
        )
}

fn date(matches: &ArgMatches, name: &str) -> Option<NaiveDate> {
    matches.get_one::<NaiveDate>(name).copied()
}

fn required_date(matches: &ArgMatches, name: &str) -> Result<NaiveDate> {
    date(matches, name).ok_or_else(|| anyhow!("--{name} is required"))
}

fn string(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn required_string(matches: &ArgMatches, name: &str) -> Result<String> {
    string(matches, name).ok_or_else(|| anyhow!("<{name}> is required"))
}

fn id(matches: &ArgMatches, name: &str) -> Result<i64> {
    matches
        .get_one::<i64>(name)
        .copied()
        .ok_or_else(|| anyhow!("<{name}> is required"))
}

fn blocked_selection(matches: &ArgMatches) -> Result<BlockedDateSelection> {
    if let Some(date) = date(matches, DATE_ARG) {
        return Ok(BlockedDateSelection::Single { date });
    }
    if let Some(dates) = matches.get_many::<NaiveDate>(DATES_ARG) {
        return Ok(BlockedDateSelection::List {
            dates: dates.copied().collect(),
        });
    }
    match (date(matches, FROM_ARG), date(matches, TO_ARG)) {
        (Some(start), Some(end)) => match matches.get_one::<String>(WEEKDAYS_ARG) {
            Some(weekdays) => Ok(BlockedDateSelection::Weekdays {
                start,
                end,
                weekdays: parse_weekdays(weekdays)?,
            }),
            None => Ok(BlockedDateSelection::Range { start, end }),
        },
        _ => bail!("Give --date, --dates, or --from with --to"),
    }
}

/// The global `--data-dir`, read at the deepest subcommand since global
/// values only propagate downwards.
fn data_dir(matches: &ArgMatches) -> PathBuf {
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    current
        .get_one::<String>(DATA_DIR_ARG)
        .or_else(|| matches.get_one::<String>(DATA_DIR_ARG))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Turn parsed arguments into a command.
pub fn parse_invocation(matches: &ArgMatches) -> Result<Invocation> {
    let data_dir = data_dir(matches);

    let command = match matches.subcommand() {
        Some(("sync", matches)) => match matches.subcommand() {
            Some(("run", _)) => CliCommand::SyncRun,
            Some(("watch", _)) => CliCommand::SyncWatch,
            Some(("history", matches)) => CliCommand::SyncHistory {
                limit: matches
                    .get_one::<usize>(LIMIT_ARG)
                    .copied()
                    .unwrap_or(DEFAULT_HISTORY_LIMIT),
            },
            other => bail!("Unknown sync command {other:?}"),
        },
        Some(("seminars", matches)) => match matches.subcommand() {
            Some(("list", matches)) => CliCommand::SeminarsList {
                from: date(matches, FROM_ARG),
                to: date(matches, TO_ARG),
            },
            Some(("assign", matches)) => CliCommand::SeminarsAssign {
                seminar_id: required_string(matches, SEMINAR_ARG)?,
                staff_id: matches.get_one::<i64>(STAFF_ARG).copied(),
            },
            Some(("schedule", matches)) => CliCommand::SeminarsSchedule {
                from: required_date(matches, FROM_ARG)?,
                to: required_date(matches, TO_ARG)?,
            },
            other => bail!("Unknown seminars command {other:?}"),
        },
        Some(("staff", matches)) => match matches.subcommand() {
            Some(("list", _)) => CliCommand::StaffList,
            Some(("add", matches)) => CliCommand::StaffAdd {
                name: required_string(matches, NAME_ARG)?,
                color: string(matches, COLOR_ARG),
            },
            Some(("update", matches)) => CliCommand::StaffUpdate {
                id: id(matches, ID_ARG)?,
                name: string(matches, NAME_ARG),
                color: string(matches, COLOR_ARG),
            },
            Some(("remove", matches)) => CliCommand::StaffRemove {
                id: id(matches, ID_ARG)?,
            },
            Some(("move", matches)) => CliCommand::StaffMove {
                id: id(matches, ID_ARG)?,
                direction: match required_string(matches, DIRECTION_ARG)?.as_str() {
                    "up" => MoveDirection::Up,
                    _ => MoveDirection::Down,
                },
            },
            Some(("next-color", _)) => CliCommand::StaffNextColor,
            other => bail!("Unknown staff command {other:?}"),
        },
        Some(("blocked", matches)) => match matches.subcommand() {
            Some(("list", matches)) => CliCommand::BlockedList {
                from: date(matches, FROM_ARG),
                to: date(matches, TO_ARG),
            },
            Some(("add", matches)) => CliCommand::BlockedAdd {
                selection: blocked_selection(matches)?,
                staff_id: matches.get_one::<i64>(STAFF_ARG).copied(),
                reason: string(matches, REASON_ARG),
            },
            Some(("remove", matches)) => CliCommand::BlockedRemove {
                ids: matches
                    .get_many::<i64>(IDS_ARG)
                    .map(|ids| ids.copied().collect())
                    .unwrap_or_default(),
            },
            Some(("clear", matches)) => {
                if !matches.get_flag(YES_ARG) {
                    bail!("Refusing to delete every blocked date without --yes");
                }
                CliCommand::BlockedClear
            }
            other => bail!("Unknown blocked command {other:?}"),
        },
        Some(("config", matches)) => match matches.subcommand() {
            Some(("show", _)) => CliCommand::ConfigShow,
            Some(("set", matches)) => CliCommand::ConfigSet {
                key: required_string(matches, KEY_ARG)?,
                value: required_string(matches, VALUE_ARG)?,
            },
            other => bail!("Unknown config command {other:?}"),
        },
        other => bail!("Unknown command {other:?}"),
    };

    Ok(Invocation { data_dir, command })
}
