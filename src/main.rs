use clap::Parser;
use studycam::cli::{
    analyze, handle_completions, handle_config_init, history, Cli, Commands, ConfigCommands,
    HistoryCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => studycam::cli::watch::run_watch(args).await,
        Commands::Analyze(args) => match analyze::handle_analyze(&args).await {
            Ok(output) => {
                println!("{}", output);
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::History(cmd) => match cmd {
            HistoryCommands::List(args) => match history::handle_history_list(&args) {
                Ok(output) => {
                    println!("{}", output);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            HistoryCommands::Clear(args) => {
                let mut stdin = std::io::stdin().lock();
                match history::handle_history_clear(&args, &mut stdin) {
                    Ok(msg) => {
                        println!("{}", msg);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => match handle_config_init(&args) {
                Ok(msg) => {
                    println!("{}", msg);
                    Ok(())
                }
                Err(e) => Err(e),
            },
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
