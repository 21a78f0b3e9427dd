use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use super::{
    ParseError,
    common::PacketComponent,
    edns::EdnsOpt,
    enums::DNSResourceType,
    header::DNSHeader,
    question::DNSQuestion,
    resource::DNSResource,
};

/// A fully decoded DNS message: header, question, and the three resource
/// record sections. EDNS0 pseudo-records are split out of the additional
/// section into `edns` rather than kept as an ordinary resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    pub edns: Option<EdnsOpt>,
}

impl DNSPacket {
    /// Parse a complete DNS message from wire bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = BitReader::endian(data, BigEndian);

        let mut header = DNSHeader::default();
        header.read(&mut reader)?;

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            let mut question = DNSQuestion::default();
            question.read_with_buffer(&mut reader, data)?;
            questions.push(question);
        }

        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, data)?;
            answers.push(record);
        }

        let mut authorities = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, data)?;
            authorities.push(record);
        }

        let mut resources = Vec::with_capacity(header.arcount as usize);
        let mut edns = None;
        for _ in 0..header.arcount {
            let mut record = DNSResource::default();
            record.read_with_buffer(&mut reader, data)?;

            if record.rtype == DNSResourceType::OPT {
                let raw_class = record.raw_class.unwrap_or(0);
                edns = Some(EdnsOpt::parse_from_resource(
                    raw_class,
                    record.ttl,
                    &record.rdata,
                )?);
            } else {
                resources.push(record);
            }
        }

        Ok(DNSPacket {
            header,
            questions,
            answers,
            authorities,
            resources,
            edns,
        })
    }

    /// Serialize back to wire bytes, recomputing section counts.
    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut packet = self.clone();
        packet.update_counts();

        let mut bytes = Vec::new();
        {
            let mut writer = BitWriter::endian(&mut bytes, BigEndian);

            packet.header.write(&mut writer)?;

            for question in &packet.questions {
                question.write(&mut writer)?;
            }
            for record in &packet.answers {
                record.write(&mut writer)?;
            }
            for record in &packet.authorities {
                record.write(&mut writer)?;
            }
            for record in &packet.resources {
                record.write(&mut writer)?;
            }
            if let Some(edns) = &packet.edns {
                Self::write_edns(&mut writer, edns)?;
            }
        }

        Ok(bytes)
    }

    /// Infallible convenience wrapper over `serialize`, matching the rest of
    /// the codebase's `to_bytes` naming convention. Falls back to an empty
    /// buffer on the (unreachable in practice) serialization error.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize().unwrap_or_default()
    }

    fn write_edns<E: bitstream_io::Endianness>(
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        edns: &EdnsOpt,
    ) -> Result<(), ParseError> {
        let (class, ttl, rdata) = edns.to_resource_format();
        writer.write_var::<u8>(8, 0)?; // root owner name
        writer.write_var::<u16>(16, DNSResourceType::OPT.into())?;
        writer.write_var::<u16>(16, class)?;
        writer.write_var::<u32>(32, ttl)?;
        writer.write_var::<u16>(16, rdata.len() as u16)?;
        writer.write_bytes(&rdata)?;
        Ok(())
    }

    fn update_counts(&mut self) {
        self.header.qdcount = self.questions.len() as u16;
        self.header.ancount = self.answers.len() as u16;
        self.header.nscount = self.authorities.len() as u16;
        self.header.arcount = self.resources.len() as u16 + self.edns.is_some() as u16;
    }

    /// Whether this message carries an EDNS0 OPT record.
    pub fn supports_edns(&self) -> bool {
        self.edns.is_some()
    }

    /// The UDP payload size the other side advertised via EDNS0, or the
    /// conventional non-EDNS default of 512 bytes.
    pub fn max_udp_payload_size(&self) -> u16 {
        self.edns.as_ref().map(|e| e.payload_size()).unwrap_or(512)
    }

    /// Attach an EDNS0 OPT record, creating or replacing the existing one.
    pub fn add_edns(&mut self, udp_payload_size: u16, dnssec_ok: bool) {
        let mut opt = EdnsOpt::with_payload_size(udp_payload_size);
        opt.set_do_flag(dnssec_ok);
        self.edns = Some(opt);
    }
}
