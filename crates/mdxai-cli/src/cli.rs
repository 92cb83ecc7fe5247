//! Command-line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

pub(crate) fn build() -> Command {
    Command::new("mdxai")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate structured MDX documents and call typed AI functions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file (default: ./mdxai.toml when present)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate one document")
                .arg(
                    Arg::new("prompt")
                        .help("Topic or instructions (read from stdin when omitted)"),
                )
                .arg(type_arg())
                .arg(
                    Arg::new("model")
                        .long("model")
                        .short('m')
                        .help("Model identifier"),
                )
                .arg(
                    Arg::new("components")
                        .long("components")
                        .value_delimiter(',')
                        .help("Comma-separated component names the document may use"),
                )
                .arg(recursive_arg())
                .arg(depth_arg())
                .arg(
                    Arg::new("stream")
                        .long("stream")
                        .action(ArgAction::SetTrue)
                        .help("Print text as it arrives"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the document to a file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("batch")
                .about("Generate one document per prompt file")
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Prompt files"),
                )
                .arg(type_arg())
                .arg(recursive_arg())
                .arg(depth_arg())
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .short('j')
                        .value_parser(value_parser!(usize))
                        .help("Maximum concurrent generations"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for generated .mdx files (default: beside each input)"),
                ),
        )
        .subcommand(
            Command::new("call")
                .about("Call an AI function and print its result as JSON")
                .arg(Arg::new("name").required(true).help("Function name"))
                .arg(
                    Arg::new("arg")
                        .long("arg")
                        .short('a')
                        .action(ArgAction::Append)
                        .help("Argument as key=value; JSON values are decoded"),
                )
                .arg(functions_dir_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List AI function specifications")
                .arg(functions_dir_arg()),
        )
}

fn type_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .short('t')
        .help("Document type (e.g. Article, Recipe)")
}

fn recursive_arg() -> Arg {
    Arg::new("recursive")
        .long("recursive")
        .short('r')
        .action(ArgAction::SetTrue)
        .help("Plan an outline first, then expand it")
}

fn depth_arg() -> Arg {
    Arg::new("depth")
        .long("depth")
        .default_value("1")
        .value_parser(value_parser!(u32))
        .help("Outline depth when --recursive is set")
}

fn functions_dir_arg() -> Arg {
    Arg::new("functions-dir")
        .long("functions-dir")
        .value_parser(value_parser!(PathBuf))
        .help("Directory of function specifications")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        build().debug_assert();
    }

    #[test]
    fn generate_arguments() {
        let matches = build()
            .try_get_matches_from([
                "mdxai", "generate", "testing", "--type", "Article", "--components", "Chart,Callout", "-r",
                "--depth", "2",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "generate");
        assert_eq!(args.get_one::<String>("type").map(String::as_str), Some("Article"));
        let components: Vec<&String> = args.get_many("components").unwrap().collect();
        assert_eq!(components, ["Chart", "Callout"]);
        assert!(args.get_flag("recursive"));
        assert_eq!(args.get_one::<u32>("depth"), Some(&2));
    }

    #[test]
    fn call_collects_repeated_args() {
        let matches = build()
            .try_get_matches_from(["mdxai", "call", "summarize", "-a", "text=hi", "--arg", "n=3"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let values: Vec<&String> = args.get_many("arg").unwrap().collect();
        assert_eq!(values, ["text=hi", "n=3"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = build()
            .try_get_matches_from(["mdxai", "list", "--log-json", "--config", "x.toml"])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        assert_eq!(matches.get_one::<PathBuf>("config"), Some(&PathBuf::from("x.toml")));
    }
}
