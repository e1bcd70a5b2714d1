use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use tourmirror::logging;
use tourmirror::mirror;
use tourmirror::mirror::MirrorOptions;
use tourmirror_core::graph_ops::OperationTemplates;
use tourmirror_core::page_id::parse_page_id;
use tourmirror_server::ServerState;

#[derive(Debug, Parser)]
#[command(name = "tourmirror", about = "Mirrors bundle-driven virtual tours for offline replay")]
struct Cli {
  #[clap(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Mirror a tour into downloads/<page-id>
  Download(DownloadArgs),
  /// Serve a previously mirrored tour
  Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct DownloadArgs {
  /// Share URL or bare page id
  page: String,
  /// Route all traffic through this proxy
  #[arg(long, env = "TOURMIRROR_PROXY")]
  proxy: Option<String>,
  /// Also fetch the dollhouse and floorplan texture crop variants
  #[arg(long)]
  advanced_download: bool,
  /// Directory holding downloads/ and graph_posts/
  #[arg(long, default_value = ".", env = "TOURMIRROR_BASE_DIR")]
  base_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
  /// Share URL or bare page id of a mirrored tour
  page: String,
  #[arg(long, default_value = "127.0.0.1")]
  host: String,
  #[arg(long, default_value_t = 8080)]
  port: u16,
  /// Directory holding downloads/ and graph_posts/
  #[arg(long, default_value = ".", env = "TOURMIRROR_BASE_DIR")]
  base_dir: PathBuf,
}

#[tokio::main]
async fn main() {
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info");
  }

  let cli = Cli::parse();
  run(cli).await.unwrap_or_else(|error| {
    eprintln!("tourmirror failed: {error:#}");
    std::process::exit(1);
  });
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  match cli.command {
    Command::Download(args) => {
      let page_id = parse_page_id(&args.page);
      let root = args.base_dir.join("downloads").join(&page_id);
      let _guards = logging::init(&root, "download.log")?;
      mirror::download(&MirrorOptions {
        page_id,
        base_dir: args.base_dir,
        proxy: args.proxy,
        advanced_download: args.advanced_download,
      })
      .await
    }
    Command::Serve(args) => {
      let page_id = parse_page_id(&args.page);
      let root = mirror::resolve_mirror_root(&args.base_dir, &page_id)?;
      let _guards = logging::init(&root, "server.log")?;
      let templates = OperationTemplates::load(&args.base_dir.join("graph_posts"), &page_id);
      let state = ServerState::new(root, templates);
      println!("View the tour at http://{}:{}/", args.host, args.port);
      tourmirror_server::serve(state, &args.host, args.port).await
    }
  }
}
