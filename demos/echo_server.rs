use std::time::Duration;

use structopt::StructOpt;

use crvr::config::KIBIBYTE;
use crvr::prelude::*;
use crvr::server::TcpServer;

#[derive(Debug, StructOpt)]
#[structopt(name = "echo_server", about = "Echoes each request back as plain text.")]
struct Opt {
    #[structopt(short, long, default_value = "8080")]
    port: u16,
    /// Per-request arena size in KiB
    #[structopt(long, default_value = "1024")]
    arena_kib: usize,
    #[structopt(long, default_value = "10")]
    timeout: u64,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn timeout(seconds: u64) -> Option<Duration> {
    if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    }
}

fn echo(req: &Request<'_>, served: &mut u64) -> Response {
    if req.path.equals_text("missing.html") {
        return Response::not_found();
    }
    *served += 1;
    let mut text = format!("#{} {} {} {}\n", served, req.method, req.path, req.version);
    for header in req.headers.iter() {
        text.push_str(&format!("{}\n", header));
    }
    if let Some(body) = req.body {
        text.push_str(&format!("\n{}\n", body));
    }
    Response::new(200)
        .with_header("Content-Type", "text/plain")
        .with_payload(text.into_bytes())
}

fn main() {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .module("crvr")
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()
        .unwrap();

    let limits = Limits {
        arena_capacity: opt.arena_kib * KIBIBYTE,
        ..Limits::default()
    };
    let mut server = TcpServer::new(
        &format!("0.0.0.0:{}", opt.port),
        limits,
        timeout(opt.timeout),
        echo,
    )
    .unwrap();
    println!("Echoing requests, check out: http://localhost:{}", opt.port);
    server.serve_forever();
}
