use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::ensure;
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    domain_name::DomainName,
    reader::{DnsMessageReader, DnsReadable},
    writer::{DnsMessageWriter, DnsWritable},
};

/// Represents a DNS message.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsMessage {
    /// Transaction id
    pub id: u16,
    /// Flags
    pub flags: DnsFlags,
    /// Questions in the DNS message
    questions: Vec<DnsQuestion>,
    /// Answers in the DNS message
    answers: Vec<DnsRecord>,
    /// Authority records in the DNS message
    authority_records: Vec<DnsRecord>,
    /// Additional records in the DNS message, including a possible OPT pseudo record.
    additional_records: Vec<DnsRecord>,
}

impl DnsMessage {
    pub fn new(
        id: u16,
        flags: DnsFlags,
        questions: Vec<DnsQuestion>,
        answers: Vec<DnsRecord>,
        authority_records: Vec<DnsRecord>,
        additional_records: Vec<DnsRecord>,
    ) -> Self {
        Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
        }
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = DnsMessageReader::new(data);

        let id = reader.read_u16()?;
        let flags = DnsFlags::read_from(&mut reader)?;

        let qdcount = reader.read_u16()?;
        let ancount = reader.read_u16()?;
        let nscount = reader.read_u16()?;
        let arcount = reader.read_u16()?;

        let questions = (0..qdcount)
            .map(|_| DnsQuestion::read_from(&mut reader))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let answers = read_records(&mut reader, ancount)?;
        let authority_records = read_records(&mut reader, nscount)?;
        let additional_records = read_records(&mut reader, arcount)?;

        Ok(Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
        })
    }

    pub fn encode(&self) -> anyhow::Result<Bytes> {
        let mut writer = DnsMessageWriter::new_with_max(u16::MAX as usize);

        writer.write_u16(self.id)?;
        self.flags.write_to(&mut writer)?;

        writer.write_u16(section_len(&self.questions)?)?;
        writer.write_u16(section_len(&self.answers)?)?;
        writer.write_u16(section_len(&self.authority_records)?)?;
        writer.write_u16(section_len(&self.additional_records)?)?;

        for question in &self.questions {
            question.write_to(&mut writer)?;
        }

        for record in self
            .answers
            .iter()
            .chain(&self.authority_records)
            .chain(&self.additional_records)
        {
            record.write_to(&mut writer)?;
        }

        Ok(writer.into_bytes())
    }

    /// Questions
    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    /// Answers
    pub fn answers(&self) -> &[DnsRecord] {
        &self.answers
    }

    /// Authority records
    pub fn authority_records(&self) -> &[DnsRecord] {
        &self.authority_records
    }

    /// Additional records
    pub fn additional_records(&self) -> &[DnsRecord] {
        &self.additional_records
    }

    /// Response code. Extended response codes carried in EDNS are not considered.
    pub fn response_code(&self) -> anyhow::Result<DnsResponseCode> {
        Ok(DnsResponseCode::try_from(self.flags.rcode_low as u16)?)
    }

    pub fn set_response_code(&mut self, response_code: DnsResponseCode) {
        self.flags.set_response_code(response_code);
    }
}

fn read_records(reader: &mut DnsMessageReader, count: u16) -> anyhow::Result<Vec<DnsRecord>> {
    (0..count).map(|_| DnsRecord::read_from(reader)).collect()
}

fn section_len<T>(section: &[T]) -> anyhow::Result<u16> {
    u16::try_from(section.len()).map_err(|_| anyhow::anyhow!("too many entries in section: {}", section.len()))
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DnsFlags {
    /// Query or Response
    pub response: bool,
    /// Opcode
    pub opcode: DnsOpcode,
    /// Authoritative Answer
    pub authoritative_answer: bool,
    /// Truncated, the message did not fit the transport
    pub truncated: bool,
    /// Recursion Desired
    pub recursion_desired: bool,
    /// Recursion Available
    pub recursion_available: bool,
    /// Reserved, must be zero.
    pub(crate) z: bool,
    /// Authentic Data
    pub authentic_data: bool,
    /// Checking Disabled
    pub checking_disabled: bool,
    /// Lower four bits of the response code.
    pub(crate) rcode_low: u8,
}

impl DnsFlags {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        response: bool,
        opcode: DnsOpcode,
        authoritative_answer: bool,
        truncated: bool,
        recursion_desired: bool,
        recursion_available: bool,
        authentic_data: bool,
        checking_disabled: bool,
    ) -> Self {
        Self {
            response,
            opcode,
            authoritative_answer,
            truncated,
            recursion_desired,
            recursion_available,
            z: false,
            authentic_data,
            checking_disabled,
            rcode_low: 0,
        }
    }

    pub fn set_response_code(&mut self, response_code: DnsResponseCode) {
        let full: u16 = response_code.into();
        self.rcode_low = (full & 0x0F) as u8;
    }

    pub fn response_code(&self) -> anyhow::Result<DnsResponseCode> {
        Ok(DnsResponseCode::try_from(self.rcode_low as u16)?)
    }
}

impl TryFrom<u16> for DnsFlags {
    type Error = anyhow::Error;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        Ok(Self {
            response: (bits >> 15) & 0x1 != 0,
            opcode: DnsOpcode::try_from(((bits >> 11) & 0xF) as u8)?,
            authoritative_answer: (bits >> 10) & 0x1 != 0,
            truncated: (bits >> 9) & 0x1 != 0,
            recursion_desired: (bits >> 8) & 0x1 != 0,
            recursion_available: (bits >> 7) & 0x1 != 0,
            z: (bits >> 6) & 0x1 != 0,
            authentic_data: (bits >> 5) & 0x1 != 0,
            checking_disabled: (bits >> 4) & 0x1 != 0,
            rcode_low: (bits & 0x0F) as u8,
        })
    }
}

impl From<DnsFlags> for u16 {
    fn from(flags: DnsFlags) -> u16 {
        let opcode: u8 = flags.opcode.into();
        ((flags.response as u16) << 15)
            | ((opcode as u16 & 0xF) << 11)
            | ((flags.authoritative_answer as u16) << 10)
            | ((flags.truncated as u16) << 9)
            | ((flags.recursion_desired as u16) << 8)
            | ((flags.recursion_available as u16) << 7)
            | ((flags.z as u16) << 6)
            | ((flags.authentic_data as u16) << 5)
            | ((flags.checking_disabled as u16) << 4)
            | (flags.rcode_low as u16 & 0x0F)
    }
}

impl DnsReadable for DnsFlags {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        DnsFlags::try_from(reader.read_u16()?)
    }
}

impl DnsWritable for DnsFlags {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_u16((*self).into())
    }
}

/// Dns response code
///
/// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum DnsResponseCode {
    /// No error
    #[default]
    NoError = 0,
    /// The request was malformed
    FormatError = 1,
    /// The server encountered an error while processing the request
    ServerFailure = 2,
    /// The requested domain does not exist
    NxDomain = 3,
    /// Not Implemented
    NotImp = 4,
    /// Query refused
    Refused = 5,
    /// Name Exists when it should not
    YXDomain = 6,
    /// RR Set Exists when it should not
    YXRRSet = 7,
    /// RR Set that should exist does not
    NXRRSet = 8,
    /// Server Not Authoritative for zone
    NotAuth = 9,
    /// Name not contained in zone
    NotZone = 10,
    /// DSO-TYPE Not Implemented
    DSOTYPENI = 11,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DnsOpcode {
    /// Standard query
    #[default]
    Query = 0,
    /// Inverse query, obsolete
    IQuery = 1,
    /// Server status request, obsolete
    Status = 2,
    /// Zone change notification
    Notify = 4,
    /// Dynamic update
    Update = 5,
    /// DNS stateful operations
    Dso = 6,
}

/// Represents a DNS question in a DNS message.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsQuestion {
    /// The domain name being queried
    pub qname: DomainName,
    /// The type of the query (e.g., A, AAAA, CNAME)
    pub qtype: RecordType,
    /// The class of the query (e.g., IN for Internet)
    pub qclass: ClassType,
}

impl DnsQuestion {
    pub fn new(qname: DomainName, qtype: RecordType, qclass: ClassType) -> Self {
        Self { qname, qtype, qclass }
    }
}

impl DnsReadable for DnsQuestion {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let qname = reader.read_qname()?;
        let qtype = RecordType::from(reader.read_u16()?);
        let qclass = ClassType::from(reader.read_u16()?);

        Ok(Self { qname, qtype, qclass })
    }
}

impl DnsWritable for DnsQuestion {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.qname)?;
        writer.write_u16(self.qtype.to_u16())?;
        writer.write_u16(self.qclass.to_u16())?;
        Ok(())
    }
}

crate::u16_enum_with_unknown! {
    /// DNS record types this server distinguishes. Every other type is carried as `Unknown`.
    ///
    /// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    pub enum RecordType {
        /// IPv4 address
        A = 1,
        /// Name server
        NS = 2,
        /// Canonical name
        CNAME = 5,
        /// Start of authority
        SOA = 6,
        /// Pointer (for reverse DNS)
        PTR = 12,
        /// Mail exchange
        MX = 15,
        /// Text strings
        TXT = 16,
        /// IPv6 address
        AAAA = 28,
        /// Service locator
        SRV = 33,
        /// OPT pseudo record (EDNS)
        OPT = 41,
        /// General-purpose service binding
        SVCB = 64,
        /// SVCB-compatible type for use with HTTP
        HTTPS = 65,
        /// All records
        ANY = 255,
    }
}

crate::u16_enum_with_unknown! {
    /// DNS classes. The OPT pseudo record abuses this field for its payload size,
    /// which then shows up as `Unknown`.
    pub enum ClassType {
        /// Internet
        IN = 1,
        /// Chaosnet
        CH = 3,
        /// Hesiod
        HS = 4,
        /// None
        NONE = 254,
        /// Any
        ANY = 255,
    }
}

/// Associated data for a DNS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecordData {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    DomainName(DomainName),
    Raw(Bytes),
}

impl DnsRecordData {
    /// Write the record data to the DNS message.
    pub fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        match self {
            DnsRecordData::Ipv4(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::Ipv6(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::DomainName(name) => writer.write_qname(name),
            DnsRecordData::Raw(data) => writer.write_bytes(data),
        }
    }

    /// Decode `data_length` bytes of record data based on the provided `record_type`.
    pub fn read_from_record_type(
        reader: &mut DnsMessageReader,
        record_type: RecordType,
        data_length: usize,
    ) -> anyhow::Result<DnsRecordData> {
        let start = reader.position();

        let data = match record_type {
            RecordType::A => {
                ensure!(data_length == 4, "invalid A record length: {}", data_length);
                let raw: [u8; 4] = reader.read_bytes(4)?.try_into()?;
                DnsRecordData::Ipv4(Ipv4Addr::from(raw))
            }
            RecordType::AAAA => {
                ensure!(data_length == 16, "invalid AAAA record length: {}", data_length);
                let raw: [u8; 16] = reader.read_bytes(16)?.try_into()?;
                DnsRecordData::Ipv6(Ipv6Addr::from(raw))
            }
            RecordType::CNAME | RecordType::NS | RecordType::PTR => DnsRecordData::DomainName(reader.read_qname()?),
            _ => DnsRecordData::Raw(Bytes::copy_from_slice(reader.read_bytes(data_length)?)),
        };

        let consumed = reader.position() - start;
        ensure!(
            consumed == data_length,
            "record data length mismatch for {:?}: declared {}, consumed {}",
            record_type,
            data_length,
            consumed
        );

        Ok(data)
    }
}

/// Represents a DNS record in a DNS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: DomainName,
    pub record_type: RecordType,
    pub class: ClassType,
    pub ttl: u32,
    pub data: DnsRecordData,
}

impl DnsRecord {
    pub fn new(name: DomainName, record_type: RecordType, class: ClassType, ttl: u32, data: DnsRecordData) -> Self {
        Self {
            name,
            record_type,
            class,
            ttl,
            data,
        }
    }

    /// An IN class A record.
    pub fn a(name: DomainName, ttl: u32, addr: Ipv4Addr) -> Self {
        Self::new(name, RecordType::A, ClassType::IN, ttl, DnsRecordData::Ipv4(addr))
    }

    /// An IN class AAAA record.
    pub fn aaaa(name: DomainName, ttl: u32, addr: Ipv6Addr) -> Self {
        Self::new(name, RecordType::AAAA, ClassType::IN, ttl, DnsRecordData::Ipv6(addr))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn class(&self) -> ClassType {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn data(&self) -> &DnsRecordData {
        &self.data
    }
}

impl DnsReadable for DnsRecord {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let name = reader.read_qname()?;
        let record_type = RecordType::from(reader.read_u16()?);
        let class = ClassType::from(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let data_length = reader.read_u16()? as usize;

        let data = DnsRecordData::read_from_record_type(reader, record_type, data_length)?;

        Ok(Self {
            name,
            record_type,
            class,
            ttl,
            data,
        })
    }
}

impl DnsWritable for DnsRecord {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.name)?;
        writer.write_u16(self.record_type.to_u16())?;
        writer.write_u16(self.class.to_u16())?;
        writer.write_u32(self.ttl)?;

        // Reserve rdlen so we can go back once we know the size.
        let rdlen_pos = writer.position();
        writer.write_u16(0)?;

        let before = writer.position();
        self.data.write(writer)?;
        let rdlen = u16::try_from(writer.position() - before)?;

        writer.overwrite_bytes(rdlen_pos, &rdlen.to_be_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::DnsMessageBuilder;

    use super::*;

    fn name(s: &str) -> DomainName {
        DomainName::from_ascii(s).unwrap()
    }

    #[test]
    fn test_flags_bits() {
        let flags = DnsFlags::try_from(0x8580).unwrap();
        assert!(flags.response);
        assert!(flags.authoritative_answer);
        assert!(flags.recursion_desired);
        assert!(flags.recursion_available);
        assert!(!flags.truncated);
        assert_eq!(flags.opcode, DnsOpcode::Query);
        assert_eq!(flags.response_code().unwrap(), DnsResponseCode::NoError);

        assert_eq!(u16::from(flags), 0x8580);
    }

    #[test]
    fn test_query_decode() {
        // id=0x1234, RD, one question example.com A IN.
        let mut raw = vec![0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        raw.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0]);
        raw.extend_from_slice(&[0, 1, 0, 1]);

        let message = DnsMessage::decode(&raw).unwrap();
        assert_eq!(message.id, 0x1234);
        assert!(message.flags.recursion_desired);
        assert!(!message.flags.response);
        assert_eq!(message.questions().len(), 1);
        assert_eq!(message.questions()[0].qname.as_str(), "example.com");
        assert_eq!(message.questions()[0].qtype, RecordType::A);
        assert_eq!(message.questions()[0].qclass, ClassType::IN);
    }

    #[test]
    fn test_query_with_opt_record() {
        let mut raw = vec![0x00, 0x07, 0x01, 0x20, 0, 1, 0, 0, 0, 0, 0, 1];
        raw.extend_from_slice(&[3, b'f', b'o', b'o', 0, 0, 28, 0, 1]);
        // OPT: root name, type 41, payload 1232, ttl 0, rdlen 0
        raw.extend_from_slice(&[0, 0, 41, 0x04, 0xD0, 0, 0, 0, 0, 0, 0]);

        let message = DnsMessage::decode(&raw).unwrap();
        assert_eq!(message.questions()[0].qtype, RecordType::AAAA);

        let opt = &message.additional_records()[0];
        assert_eq!(opt.record_type, RecordType::OPT);
        assert!(opt.name.is_root());
        assert_eq!(opt.class, ClassType::Unknown(1232));
        assert_eq!(opt.data, DnsRecordData::Raw(Bytes::new()));
    }

    #[test]
    fn test_answer_encoding() {
        let qname = name("ads.example.com");
        let message = DnsMessageBuilder::new()
            .with_id(99)
            .add_question(DnsQuestion::new(qname.clone(), RecordType::A, ClassType::IN))
            .add_answer(DnsRecord::a(qname.clone(), 3600, Ipv4Addr::LOCALHOST))
            .add_answer(DnsRecord::aaaa(qname.clone(), 3600, Ipv6Addr::LOCALHOST))
            .with_response(DnsResponseCode::NoError)
            .build();

        let decoded = DnsMessage::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);

        let answer = &decoded.answers()[0];
        assert_eq!(answer.ttl(), 3600);
        assert_eq!(answer.data(), &DnsRecordData::Ipv4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(decoded.answers()[1].data(), &DnsRecordData::Ipv6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_unknown_types_survive() {
        let qname = name("example.com");
        let record = DnsRecord::new(
            qname.clone(),
            RecordType::from(99),
            ClassType::IN,
            60,
            DnsRecordData::Raw(Bytes::from_static(b"\x04spf1")),
        );
        let message = DnsMessageBuilder::new()
            .add_question(DnsQuestion::new(qname, RecordType::from(99), ClassType::IN))
            .add_answer(record)
            .build();

        let decoded = DnsMessage::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded.questions()[0].qtype, RecordType::Unknown(99));
        assert_eq!(decoded.answers()[0].data(), &DnsRecordData::Raw(Bytes::from_static(b"\x04spf1")));
    }

    #[test]
    fn test_decode_rejects_bad_rdata_length() {
        let mut raw = vec![0, 1, 0x81, 0x80, 0, 0, 0, 1, 0, 0, 0, 0];
        // root A record with a 3 byte address.
        raw.extend_from_slice(&[0, 0, 1, 0, 1, 0, 0, 0, 10, 0, 3, 127, 0, 0]);
        assert!(DnsMessage::decode(&raw).is_err());
    }

    #[test]
    fn test_decode_truncated_header() {
        assert!(DnsMessage::decode(&[0, 1, 2]).is_err());
    }
}
