use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};
use logging::MAX_VERBOSITY;
use protocol::Options;

/// Options plus the positional operands left over after flag parsing.
#[derive(Debug)]
pub(crate) struct ParsedArgs {
    pub opts: Options,
    pub operands: Vec<String>,
}

pub(crate) fn command() -> Command {
    Command::new("oxsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("synchronize file trees over the rsync wire protocol, version 27")
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .action(ArgAction::SetTrue)
                .help("recurse into source directories"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("increase verbosity (repeatable)"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("show what would be transferred without changing anything"),
        )
        .arg(
            Arg::new("times")
                .short('t')
                .long("times")
                .action(ArgAction::SetTrue)
                .help("preserve modification times"),
        )
        .arg(
            Arg::new("perms")
                .short('p')
                .long("perms")
                .action(ArgAction::SetTrue)
                .help("preserve permissions"),
        )
        .arg(
            Arg::new("links")
                .short('l')
                .long("links")
                .action(ArgAction::SetTrue)
                .help("copy symlinks as symlinks"),
        )
        .arg(
            Arg::new("delete")
                .long("delete")
                .action(ArgAction::SetTrue)
                .help("delete sink files the sender does not have"),
        )
        .arg(
            Arg::new("sender")
                .long("sender")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
        .arg(
            Arg::new("server")
                .long("server")
                .action(ArgAction::SetTrue)
                .hide(true),
        )
        .arg(
            Arg::new("rsync-path")
                .long("rsync-path")
                .value_name("PROGRAM")
                .help("program to run on the remote machine"),
        )
        .arg(
            Arg::new("operands")
                .value_name("SOURCE... DEST")
                .num_args(0..)
                .trailing_var_arg(true),
        )
}

pub(crate) fn parse<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(arguments)?;

    let opts = Options {
        sender: matches.get_flag("sender"),
        server: matches.get_flag("server"),
        recursive: matches.get_flag("recursive"),
        verbose: matches.get_count("verbose").min(MAX_VERBOSITY),
        dry_run: matches.get_flag("dry-run"),
        preserve_times: matches.get_flag("times"),
        preserve_perms: matches.get_flag("perms"),
        preserve_links: matches.get_flag("links"),
        del: matches.get_flag("delete"),
        rsync_path: matches.get_one::<String>("rsync-path").cloned(),
    };
    let operands = matches
        .get_many::<String>("operands")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Ok(ParsedArgs { opts, operands })
}
