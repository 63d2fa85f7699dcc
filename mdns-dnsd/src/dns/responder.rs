use std::sync::Arc;
use futures::future::BoxFuture;
use futures::FutureExt;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use crate::directory::Directory;
use crate::rewrite::qualified_suffix;
use super::{next_or_failure, reply_to, Handler, Reply};

/// Answers A/AAAA queries under the configured domain from the directory.
pub struct MdnsResponder {
    /// ".example.com."
    suffix: String,
    directory: Directory,
    ttl: u32,
    next: Option<Arc<dyn Handler>>,
}

impl MdnsResponder {
    pub fn new(domain: &str, directory: Directory, ttl: u32) -> Self {
        Self {
            suffix: qualified_suffix(&domain.to_ascii_lowercase()),
            directory,
            ttl,
            next: None,
        }
    }

    pub fn with_next(mut self, next: Arc<dyn Handler>) -> Self {
        self.next = Some(next);
        self
    }

    fn in_domain(&self, qname: &str) -> bool {
        qname.ends_with(&self.suffix)
    }

    /// Record for `qname` from the directory, if it has the requested family.
    ///
    /// Only the first address of each family is served. CNAME and SRV get
    /// through the type gate but are never synthesized.
    fn lookup(&self, qname: &str, qtype: RecordType) -> Option<Record> {
        let entry = self.directory.lookup(qname)?;
        let name = hickory_proto::rr::Name::from_ascii(qname).ok()?;

        let rdata = match qtype {
            RecordType::A => RData::A(A(entry.first_ipv4()?)),
            RecordType::AAAA => RData::AAAA(AAAA(entry.first_ipv6()?)),
            _ => return None,
        };
        Some(Record::from_rdata(name, self.ttl, rdata))
    }

    async fn respond(&self, request: &Message) -> Reply {
        let Some(query) = request.queries().first() else {
            return Reply::failure(ResponseCode::FormErr);
        };

        let mut qname = query.name().to_ascii().to_ascii_lowercase();
        if !qname.ends_with('.') {
            qname.push('.');
        }
        let qtype = query.query_type();
        tracing::debug!("Looking for name: {} ({})", qname, qtype);

        if !self.in_domain(&qname) {
            tracing::debug!(
                "Skipping due to query '{}' not in our domain '{}'",
                qname,
                self.suffix
            );
            return next_or_failure(self.next.as_ref(), request).await;
        }

        if !matches!(
            qtype,
            RecordType::A | RecordType::AAAA | RecordType::SRV | RecordType::CNAME
        ) {
            tracing::debug!("Skipping due to unrecognized query type {}", qtype);
            return Reply::failure(ResponseCode::ServFail);
        }

        match self.lookup(&qname, qtype) {
            Some(record) => {
                let mut msg = reply_to(request);
                msg.set_authoritative(true)
                    .set_recursion_available(true)
                    .set_response_code(ResponseCode::NoError);
                msg.add_answer(record);
                Reply::answer(msg)
            }
            None => {
                tracing::debug!("No {} records found for '{}'", qtype, qname);
                Reply::failure(ResponseCode::ServFail)
            }
        }
    }
}

impl Handler for MdnsResponder {
    fn name(&self) -> &'static str {
        "mdns"
    }

    fn serve<'a>(&'a self, request: &'a Message) -> BoxFuture<'a, Reply> {
        self.respond(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::atomic::Ordering;
    use chrono::Utc;
    use shared::types::ServiceEntry;
    use crate::dns::tests::{query, Recorder};

    fn store() -> Directory {
        let directory = Directory::new();
        directory.reconcile(HashMap::from([
            (
                "foo.example.com.".to_string(),
                ServiceEntry {
                    instance: "foo".to_string(),
                    hostname: "foo.local.".to_string(),
                    ipv4: vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 6)],
                    ipv6: Vec::new(),
                    port: 9,
                    txt: BTreeMap::new(),
                    observed_at: Utc::now(),
                },
            ),
            (
                "six.example.com.".to_string(),
                ServiceEntry {
                    instance: "six".to_string(),
                    hostname: "six.local.".to_string(),
                    ipv4: Vec::new(),
                    ipv6: vec!["fd00::5".parse::<Ipv6Addr>().unwrap()],
                    port: 9,
                    txt: BTreeMap::new(),
                    observed_at: Utc::now(),
                },
            ),
        ]));
        directory
    }

    fn responder() -> (MdnsResponder, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let responder = MdnsResponder::new("example.com", store(), 60).with_next(recorder.clone());
        (responder, recorder)
    }

    #[tokio::test]
    async fn test_a_query_answers_first_ipv4() {
        let (responder, recorder) = responder();
        let reply = responder.serve(&query("foo.example.com.", RecordType::A)).await;

        assert_eq!(reply.code, ResponseCode::NoError);
        let msg = reply.message.unwrap();
        assert!(msg.authoritative());
        assert!(msg.recursion_available());
        assert_eq!(msg.id(), 4242);
        assert_eq!(msg.answers().len(), 1);

        let answer = &msg.answers()[0];
        assert_eq!(answer.record_type(), RecordType::A);
        assert_eq!(answer.ttl(), 60);
        assert_eq!(answer.name().to_ascii(), "foo.example.com.");
        assert_eq!(answer.data(), Some(&RData::A(A(Ipv4Addr::new(10, 0, 0, 5)))));
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aaaa_query_answers_first_ipv6() {
        let (responder, _) = responder();
        let reply = responder.serve(&query("six.example.com.", RecordType::AAAA)).await;

        let msg = reply.message.unwrap();
        assert_eq!(msg.answers().len(), 1);
        assert_eq!(
            msg.answers()[0].data(),
            Some(&RData::AAAA(AAAA("fd00::5".parse().unwrap())))
        );
    }

    #[tokio::test]
    async fn test_missing_family_is_servfail() {
        let (responder, recorder) = responder();
        let reply = responder.serve(&query("foo.example.com.", RecordType::AAAA)).await;

        assert_eq!(reply.code, ResponseCode::ServFail);
        assert!(reply.message.is_none());
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_name_is_servfail() {
        let (responder, recorder) = responder();
        let reply = responder.serve(&query("bar.example.com.", RecordType::A)).await;

        assert_eq!(reply.code, ResponseCode::ServFail);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_domain_is_delegated() {
        let (responder, recorder) = responder();
        let reply = responder.serve(&query("foo.other.com.", RecordType::A)).await;

        assert_eq!(reply.code, ResponseCode::NXDomain);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_domain_delegated_even_if_stored() {
        let directory = store();
        directory.reconcile(HashMap::from([(
            "foo.other.com.".to_string(),
            directory.lookup("foo.example.com.").unwrap(),
        )]));
        let recorder = Arc::new(Recorder::default());
        let responder = MdnsResponder::new("example.com", directory, 60).with_next(recorder.clone());

        responder.serve(&query("foo.other.com.", RecordType::A)).await;
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_suffix_must_match_on_label_boundary() {
        let (responder, recorder) = responder();
        responder.serve(&query("fooexample.com.", RecordType::A)).await;
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_domain_without_next_is_servfail() {
        let responder = MdnsResponder::new("example.com", store(), 60);
        let reply = responder.serve(&query("foo.other.com.", RecordType::A)).await;
        assert_eq!(reply.code, ResponseCode::ServFail);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_servfail_without_delegation() {
        let (responder, recorder) = responder();
        for qtype in [RecordType::MX, RecordType::TXT, RecordType::PTR, RecordType::ANY] {
            let reply = responder.serve(&query("foo.example.com.", qtype)).await;
            assert_eq!(reply.code, ResponseCode::ServFail, "{}", qtype);
        }
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cname_and_srv_are_not_synthesized() {
        let (responder, recorder) = responder();
        for qtype in [RecordType::CNAME, RecordType::SRV] {
            let reply = responder.serve(&query("foo.example.com.", qtype)).await;
            assert_eq!(reply.code, ResponseCode::ServFail);
        }
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_name_case_is_ignored() {
        let (responder, _) = responder();
        let reply = responder.serve(&query("FOO.Example.COM.", RecordType::A)).await;
        assert_eq!(reply.code, ResponseCode::NoError);
    }

    #[tokio::test]
    async fn test_configured_domain_with_trailing_dot() {
        let responder = MdnsResponder::new("example.com.", store(), 60);
        let reply = responder.serve(&query("foo.example.com.", RecordType::A)).await;
        assert_eq!(reply.code, ResponseCode::NoError);
    }
}
