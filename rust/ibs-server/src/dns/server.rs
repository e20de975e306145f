//! DNS Server
//!
//! UDP front end for the resolver. Every datagram is handled on its own
//! task, and every question in a message is resolved independently.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::api::Metrics;
use crate::config::ServerConfig;
use crate::dns::handler::DnsResolver;
use crate::dns::packet::{self, Query};
use crate::registry::SharedRegistry;

/// Receive buffer size. Larger than a classic reply so EDNS queries still parse.
const DNS_RECV_BUFFER_SIZE: usize = 4096;

/// Run the DNS server
pub async fn run_dns_server(
    config: Arc<ServerConfig>,
    registry: SharedRegistry,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.bind_address, config.dns_port);

    let socket = Arc::new(UdpSocket::bind(addr).await?);

    info!("🌐 DNS server listening on {} (suffix .{})", addr, config.dns_suffix);

    let resolver = Arc::new(DnsResolver::new(registry, &config, metrics));

    loop {
        let mut buf = vec![0u8; DNS_RECV_BUFFER_SIZE];
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                buf.truncate(len);
                let resolver = resolver.clone();
                let socket = socket.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_dns_query(socket.as_ref(), src, &buf, &resolver).await {
                        debug!("DNS query error from {}: {}", src, e);
                    }
                });
            }
            Err(e) => {
                error!("DNS socket error: {}", e);
            }
        }
    }
}

/// Handle a single DNS datagram
async fn handle_dns_query(
    socket: &UdpSocket,
    src: SocketAddr,
    request: &[u8],
    resolver: &DnsResolver,
) -> anyhow::Result<()> {
    // Malformed packets are dropped without a reply
    let query = packet::parse_query(request)?;

    if query.questions.is_empty() {
        return Ok(()); // No questions
    }

    resolver.metrics().inc_dns_queries();

    let response = answer_query(&query, resolver).await;
    socket.send_to(&response, src).await?;

    Ok(())
}

/// Resolve every question and encode the reply
///
/// A question that fails to resolve is logged and contributes no answer;
/// it never fails the whole message.
pub async fn answer_query(query: &Query, resolver: &DnsResolver) -> Vec<u8> {
    let mut answers = Vec::new();

    for (index, question) in query.questions.iter().enumerate() {
        resolver.metrics().inc_dns_questions();

        match resolver.resolve(&question.name, question.qtype).await {
            Ok(answer) => answers.push((index, answer)),
            Err(e) => {
                resolver.metrics().inc_dns_failures();
                debug!(name = %question.name, qtype = question.qtype, "Failed to resolve record: {}", e);
            }
        }
    }

    packet::build_response(query, &answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::packet::tests::build_query;
    use crate::dns::packet::{TYPE_A, TYPE_AAAA};
    use crate::registry;
    use crate::types::DeviceRecord;
    use chrono::Utc;
    use std::sync::atomic::Ordering;

    async fn test_resolver() -> DnsResolver {
        let registry = registry::shared();
        registry.write().await.put(DeviceRecord {
            name: "foo".to_string(),
            address: "192.168.0.1".parse().unwrap(),
            hardware_id: "aa:bb:cc:dd:ee:ff".to_string(),
            last_report: Utc::now(),
        });

        DnsResolver::new(registry, &ServerConfig::default(), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_multi_question_message() {
        let resolver = test_resolver().await;
        let request = build_query(
            0xBEEF,
            &[("foo.other.", TYPE_A), ("foo.ibs.", TYPE_A), ("foo.ibs.bar.", TYPE_A)],
        );
        let query = packet::parse_query(&request).unwrap();

        let response = answer_query(&query, &resolver).await;

        assert_eq!(response[0..2], [0xBE, 0xEF]);
        assert_eq!(response[3] & 0x0F, 0); // NOERROR
        assert_eq!(u16::from_be_bytes([response[4], response[5]]), 3);
        assert_eq!(u16::from_be_bytes([response[6], response[7]]), 1);

        // The single answer points at the second question's name
        let answer = &response[request.len()..];
        let second_name = 12 + "foo.other.".len() + 1 + 4;
        assert_eq!(answer[0..2], (0xC000u16 | second_name as u16).to_be_bytes());
        assert_eq!(answer[12..16], [192, 168, 0, 1]);

        assert_eq!(resolver.metrics().dns_questions.load(Ordering::Relaxed), 3);
        assert_eq!(resolver.metrics().dns_failures.load(Ordering::Relaxed), 2);
        assert_eq!(resolver.metrics().dns_answers.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_no_answers_still_replies() {
        let resolver = test_resolver().await;
        let request = build_query(9, &[("foo.ibs.", TYPE_AAAA), ("bar.ibs.", TYPE_A)]);
        let query = packet::parse_query(&request).unwrap();

        let response = answer_query(&query, &resolver).await;

        assert_eq!(response.len(), request.len());
        assert_eq!(u16::from_be_bytes([response[6], response[7]]), 0);
        assert_ne!(response[2] & 0x04, 0); // AA
    }

    #[tokio::test]
    async fn test_mixed_case_query() {
        let resolver = test_resolver().await;
        let request = build_query(5, &[("fOo.IbS.", TYPE_A)]);
        let query = packet::parse_query(&request).unwrap();

        let response = answer_query(&query, &resolver).await;

        assert_eq!(u16::from_be_bytes([response[6], response[7]]), 1);
        // Question echoed with the case it was asked in
        assert_eq!(response[12..request.len()], request[12..]);
        assert_eq!(response[response.len() - 4..], [192, 168, 0, 1]);
    }

    #[tokio::test]
    async fn test_udp_round_trip() {
        let resolver = Arc::new(test_resolver().await);
        let server = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server.local_addr().unwrap();

        let server_task = {
            let server = server.clone();
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; DNS_RECV_BUFFER_SIZE];
                let (len, src) = server.recv_from(&mut buf).await.unwrap();
                handle_dns_query(&server, src, &buf[..len], &resolver).await.unwrap();
            })
        };

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&build_query(42, &[("foo.ibs.", TYPE_A)]), server_addr)
            .await
            .unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        server_task.await.unwrap();

        assert_eq!(buf[0..2], 42u16.to_be_bytes());
        assert_eq!(u16::from_be_bytes([buf[6], buf[7]]), 1);
        assert_eq!(buf[len - 4..len], [192, 168, 0, 1]);
        assert_eq!(resolver.metrics().dns_queries.load(Ordering::Relaxed), 1);
    }
}
