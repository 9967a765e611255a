use super::message::{DnsFlags, DnsMessage, DnsOpcode, DnsQuestion, DnsRecord, DnsResponseCode};

/// Builder
#[derive(Debug, Clone)]
pub struct DnsMessageBuilder {
    id: u16,
    flags: DnsFlags,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsRecord>,
    authority_records: Vec<DnsRecord>,
    additional_records: Vec<DnsRecord>,
    response_code: Option<DnsResponseCode>,
}

impl Default for DnsMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsMessageBuilder {
    /// Create a new builder for a recursive standard query.
    pub fn new() -> Self {
        Self {
            id: 0,
            flags: DnsFlags::new(false, DnsOpcode::Query, false, false, true, false, false, false),
            questions: Vec::new(),
            answers: Vec::new(),
            authority_records: Vec::new(),
            additional_records: Vec::new(),
            response_code: None,
        }
    }

    /// Start a response to `query`: same id, opcode and question section, with the
    /// RD and CD bits echoed back.
    pub fn reply_to(query: &DnsMessage) -> Self {
        let flags = DnsFlags::new(
            true,
            query.flags.opcode,
            false,
            false,
            query.flags.recursion_desired,
            false,
            false,
            query.flags.checking_disabled,
        );

        Self::new()
            .with_id(query.id)
            .with_flags(flags)
            .with_questions(query.questions().to_vec())
    }

    /// Set the ID for the DNS packet.
    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    /// Set the flags for the DNS packet.
    pub fn with_flags(mut self, flags: DnsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Mark the answer as authoritative.
    pub fn authoritative(mut self, aa: bool) -> Self {
        self.flags.authoritative_answer = aa;
        self
    }

    /// Advertise recursion support.
    pub fn recursion_available(mut self, ra: bool) -> Self {
        self.flags.recursion_available = ra;
        self
    }

    pub fn with_questions(mut self, questions: Vec<DnsQuestion>) -> Self {
        self.questions = questions;
        self
    }

    /// Add a question to the DNS packet.
    pub fn add_question(mut self, question: DnsQuestion) -> Self {
        self.questions.push(question);
        self
    }

    pub fn with_answers(mut self, answers: Vec<DnsRecord>) -> Self {
        self.answers = answers;
        self
    }

    /// Add an answer to the DNS packet.
    pub fn add_answer(mut self, answer: DnsRecord) -> Self {
        self.answers.push(answer);
        self
    }

    pub fn with_authority_records(mut self, records: Vec<DnsRecord>) -> Self {
        self.authority_records = records;
        self
    }

    /// Add an additional record to the DNS packet.
    pub fn add_additional_record(mut self, record: DnsRecord) -> Self {
        self.additional_records.push(record);
        self
    }

    /// Turn the message into a response carrying `response_code`.
    pub fn with_response(mut self, response_code: DnsResponseCode) -> Self {
        self.response_code = Some(response_code);
        self
    }

    pub fn build(self) -> DnsMessage {
        let mut flags = self.flags;
        if let Some(rcode) = self.response_code {
            flags.response = true;
            flags.set_response_code(rcode);
        }

        DnsMessage::new(
            self.id,
            flags,
            self.questions,
            self.answers,
            self.authority_records,
            self.additional_records,
        )
    }
}
