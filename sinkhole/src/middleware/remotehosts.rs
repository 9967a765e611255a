use std::net::{Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use bytes::Bytes;
use sinkhole_context::{DnsMiddleware, DnsRequestCtx};
use sinkhole_dns::{ClassType, DnsMessageBuilder, DnsRecord, DnsResponseCode, RecordType};

use crate::{global::Global, local::Local};

/// TTL of synthesized sinkhole answers.
pub const SINKHOLE_TTL: u32 = 3600;

/// Answers A and AAAA queries for blackholed names with a loopback address.
///
/// Everything else, including other record types for blocked names, goes on to the resolver.
pub struct RemoteHostsMiddleware;

#[async_trait]
impl DnsMiddleware<Global, Local> for RemoteHostsMiddleware {
    async fn on_query(&self, ctx: &DnsRequestCtx<Global, Local>) -> anyhow::Result<Option<Bytes>> {
        let message = ctx.message()?;

        let Some(question) = message.questions().first() else {
            return Ok(None);
        };

        if question.qclass != ClassType::IN {
            return Ok(None);
        }

        let answer = match question.qtype {
            RecordType::A => DnsRecord::a(question.qname.clone(), SINKHOLE_TTL, Ipv4Addr::LOCALHOST),
            RecordType::AAAA => DnsRecord::aaaa(question.qname.clone(), SINKHOLE_TTL, Ipv6Addr::LOCALHOST),
            _ => return Ok(None),
        };

        if !ctx.global().blackhole.contains_raw(question.qname.as_str()) {
            return Ok(None);
        }

        let resp_bytes = DnsMessageBuilder::reply_to(message)
            .authoritative(true)
            .recursion_available(true)
            .add_answer(answer)
            .with_response(DnsResponseCode::NoError)
            .build()
            .encode()?;

        let hits = ctx.global().record_hit();
        tracing::debug!(
            "incoming query {} is blocked ({} hits), answered in {:?}",
            question.qname,
            hits,
            ctx.local().time_elapsed()
        );

        Ok(Some(resp_bytes))
    }
}

#[cfg(test)]
#[path = "remotehosts_tests.rs"]
mod remotehosts_tests;
