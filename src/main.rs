use multicast_cluster::cluster::node::Cluster;
use multicast_cluster::config::types::{ClusterConfiguration, MembershipScheme, MulticastConfig};
use multicast_cluster::membership::types::MemberId;
use multicast_cluster::messaging::types::ClusterMessage;
use serde_json::json;
use std::net::IpAddr;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--group <multicast-addr>] [--group-port <port>] [--ttl <hops>] [--timeout <millis>] [--ping]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:4001", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:4002 --group 228.0.0.4 --group-port 45564 --ping",
            args[0]
        );
        std::process::exit(1);
    }

    let mut bind: Option<(IpAddr, u16)> = None;
    let mut group: IpAddr = "228.0.0.4".parse()?;
    let mut group_port: u16 = 45564;
    let mut ttl: u8 = 100;
    let mut timeout_millis: u32 = 0;
    let mut ping = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                let addr: std::net::SocketAddr = args[i + 1].parse()?;
                bind = Some((addr.ip(), addr.port()));
                i += 2;
            }
            "--group" => {
                group = args[i + 1].parse()?;
                i += 2;
            }
            "--group-port" => {
                group_port = args[i + 1].parse()?;
                i += 2;
            }
            "--ttl" => {
                ttl = args[i + 1].parse()?;
                i += 2;
            }
            "--timeout" => {
                timeout_millis = args[i + 1].parse()?;
                i += 2;
            }
            "--ping" => {
                ping = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let (host, port) = bind.expect("--bind is required");
    let config = ClusterConfiguration::new(
        MemberId::new(host, port),
        MembershipScheme::Multicast(MulticastConfig::new(group, group_port, timeout_millis, ttl)),
    );

    tracing::info!("Starting node {}:{} on group {}:{}", host, port, group, group_port);

    let cluster = Cluster::new(config).await?;

    // Every node answers pings with its own identity.
    let identity = cluster.local_member().to_string();
    cluster.register_handler("ping", move |payload| {
        let identity = identity.clone();
        async move {
            tracing::info!("Ping received: {}", payload);
            Ok(json!({ "pong": identity }))
        }
    });

    let membership_probe = cluster.add_coordinated_activity("log-stable-view", {
        let cluster = cluster.clone();
        move || async move {
            tracing::info!("Stable view: {} remote member(s)", cluster.members().len());
            Ok(())
        }
    });

    // Blocks for the discovery window; after this the view is stable and the
    // transport is up.
    cluster.initialize().await?;
    if !membership_probe.is_execution_complete() {
        tracing::warn!("Stable-view probe did not run; barrier fired without it");
    }

    // Stats reporter.
    let stats_cluster = cluster.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            let members = stats_cluster.members();
            tracing::info!("Cluster stats: {} remote member(s)", members.len());
            for member in members {
                tracing::info!("  - {} ({:?})", member.id, member.status);
            }
        }
    });

    // Optional broadcast ping loop to demonstrate messaging.
    if ping {
        let ping_cluster = cluster.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3));
            loop {
                interval.tick().await;
                let message = ClusterMessage::new("ping", json!(ping_cluster.local_member().to_string()));
                if let Err(e) = ping_cluster.send_message(&message).await {
                    tracing::warn!("Ping broadcast failed: {}", e);
                    continue;
                }
                match message.await_executed(Duration::from_secs(2)).await {
                    Some(result) => tracing::info!("Ping answered: {}", result),
                    None => tracing::info!("Ping unanswered (best-effort transport)"),
                }
            }
        });
    }

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    cluster.shutdown().await;

    Ok(())
}
