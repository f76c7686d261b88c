pub use parser::{parse, ParseError};

/// Parse textual route templates into [`Segment`](super::Segment)s.
///
/// ```text
/// template : ( literal | param )*
/// literal  : ( pchar | '/' )+
/// pchar    : unreserved
///          | pct-encoded
///          | sub-delims
///          | ':'
///          | '@'
/// unreserved     : ALPHA
///                | DIGIT
///                | "-"
///                | "."
///                | "_"
///                | "~"
/// pct-encoded    : '%' HEXDIG HEXDIG
/// sub-delims     : '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
/// param    : '{' SPACE* name SPACE* ( ':' SPACE* kind SPACE* )? '}'
/// name     : ( ALPHA | '_' ) ( ALPHA | DIGIT | '_' )*
/// kind     : 'string' | 'boolean' | 'integer' | 'float' | 'date' | 'datetime'
///          | 'array' SPACE* '<' SPACE* kind SPACE* '>'
/// ```
mod parser {
    use std::sync::Arc;

    use super::super::{
        decoders::{
            ArrayDecoder, BooleanDecoder, DateDecoder, DateTimeDecoder, FloatDecoder,
            IntegerDecoder, StringDecoder,
        },
        Decoder, Param, Segment,
    };

    #[derive(Debug, thiserror::Error, PartialEq)]
    pub enum ParseError {
        #[error("encountered byte 0x{actual:x} at position {pos}, but expected 0x{expected:x}")]
        ExpectedExact {
            expected: u8,
            actual: u8,
            pos: usize,
        },
        #[error("encountered byte 0x{actual:x} at position {pos}, but expected {expected}")]
        Expected {
            expected: &'static str,
            actual: u8,
            pos: usize,
        },
        #[error("encountered unexpected end of stream at position {pos}")]
        EndOfStream { pos: usize },
        #[error("unknown parameter kind `{kind}` at position {pos}")]
        UnknownKind { kind: String, pos: usize },
    }

    type Result<T> = std::result::Result<T, ParseError>;

    /// Parses a whole template.
    pub fn parse(template: &str) -> Result<Vec<Segment>> {
        Parser::new(template.as_bytes()).parse()
    }

    pub struct Parser<'b> {
        /// Route template to parse.
        bytes: &'b [u8],
        /// start position of current literal.
        anchor: usize,
        /// current parse position.
        cursor: usize,
    }

    impl<'b> Parser<'b> {
        /// Create a new [`Parser`].
        pub fn new(bytes: &'b [u8]) -> Self {
            Self {
                bytes,
                anchor: 0,
                cursor: 0,
            }
        }

        /// Parse a route template.
        pub fn parse(&mut self) -> Result<Vec<Segment>> {
            let mut segments = Vec::new();

            while let Some(x) = self.peek() {
                match x {
                    b'{' => {
                        self.flush_literal(&mut segments);

                        // consume the brace
                        self.cursor += 1;

                        self.ws();
                        let name = self.parameter_name()?;
                        self.ws();

                        let decoder: Arc<dyn Decoder> = match self.consume(b':') {
                            Ok(_) => {
                                self.ws();
                                let decoder = self.kind()?;
                                self.ws();
                                decoder
                            }
                            Err(_) => Arc::new(StringDecoder),
                        };

                        self.consume(b'}')?;

                        self.anchor = self.cursor;
                        segments.push(Segment::Param(Param::new(name, decoder)));
                    }
                    b'/' => self.cursor += 1,
                    _ => {
                        self.pchar()?;
                    }
                }
            }

            self.flush_literal(&mut segments);
            Ok(segments)
        }

        /// Pushes the literal between anchor and cursor, if any.
        fn flush_literal(&mut self, segments: &mut Vec<Segment>) {
            let literal = &self.bytes[self.anchor..self.cursor];
            if !literal.is_empty() {
                // Only ASCII bytes are accepted into literals.
                let literal = String::from_utf8_lossy(literal).into_owned();
                segments.push(Segment::Literal(literal));
            }
            self.anchor = self.cursor;
        }

        /// Parses a parameter name.
        fn parameter_name(&mut self) -> Result<String> {
            let name = {
                let (name_bytes, ()) = self.capture(|parser| {
                    let first = parser.any()?;
                    if !(first.is_ascii_alphabetic() || first == b'_') {
                        parser.cursor -= 1;
                        return Err(parser.expected("a parameter name", first));
                    }
                    parser.skip_while(|x| x.is_ascii_alphanumeric() || x == b'_');
                    Ok(())
                })?;

                String::from_utf8_lossy(name_bytes).into_owned()
            };

            Ok(name)
        }

        /// Parses a parameter kind into its decoder.
        fn kind(&mut self) -> Result<Arc<dyn Decoder>> {
            let start = self.cursor;
            let (word, ()) = self.capture(|parser| {
                parser.skip_while(|x| x.is_ascii_alphabetic());
                Ok(())
            })?;
            let word = String::from_utf8_lossy(word).into_owned();

            let decoder: Arc<dyn Decoder> = match word.as_str() {
                "string" => Arc::new(StringDecoder),
                "boolean" => Arc::new(BooleanDecoder),
                "integer" => Arc::new(IntegerDecoder),
                "float" => Arc::new(FloatDecoder),
                "date" => Arc::new(DateDecoder),
                "datetime" => Arc::new(DateTimeDecoder),
                "array" => {
                    self.ws();
                    self.consume(b'<')?;
                    self.ws();
                    let element = self.kind()?;
                    self.ws();
                    self.consume(b'>')?;
                    Arc::new(ArrayDecoder::new(element))
                }
                "" => {
                    let actual = self.any()?;
                    self.cursor -= 1;
                    return Err(self.expected("a parameter kind", actual));
                }
                _ => {
                    return Err(ParseError::UnknownKind {
                        kind: word,
                        pos: start,
                    })
                }
            };

            Ok(decoder)
        }

        /// Parses a `pchar`. This is defined by [RFC 3986][rfc].
        ///
        /// [rfc]: https://www.rfc-editor.org/rfc/rfc3986#section-3.3
        fn pchar(&mut self) -> Result<u8> {
            if let Some(x) = self.unreserved() {
                return Ok(x);
            }

            match self.peek() {
                Some(b'%') => self.percent_encoded(),
                Some(b':' | b'@') => self.any(),
                Some(_) => self.sub_delimiter(),
                None => Err(ParseError::EndOfStream { pos: self.cursor }),
            }
        }

        /// Parses a unreserved character. This is defined by [RFC 3986][rfc].
        ///
        /// [rfc]: https://www.rfc-editor.org/rfc/rfc3986#section-2.3
        fn unreserved(&mut self) -> Option<u8> {
            self.peek()
                .filter(|x| x.is_ascii_alphanumeric() || matches!(x, b'-' | b'.' | b'_' | b'~'))
                .inspect(|_| self.cursor += 1)
        }

        /// Parses a percent-encoded byte. This is defined by [RFC 3986][rfc].
        ///
        /// [rfc]: https://www.rfc-editor.org/rfc/rfc3986#section-2.1
        fn percent_encoded(&mut self) -> Result<u8> {
            self.consume(b'%')?;

            let upper = self.hex_digit()?;
            let lower = self.hex_digit()?;

            Ok((upper << 4) | lower)
        }

        /// Parses a single hexadecimal digit and returns its numeric value, or
        /// a [`ParseError`] if the byte is no valid hexadecimal digit.
        fn hex_digit(&mut self) -> Result<u8> {
            Ok(match self.any()? {
                x @ b'0'..=b'9' => x - b'0',
                x @ b'A'..=b'F' => x - b'A' + 0xA,
                x @ b'a'..=b'f' => x - b'a' + 0xA,
                x => {
                    self.cursor -= 1;
                    return Err(self.expected("a hex digit", x));
                }
            })
        }

        /// Parses a sub-delimiter. This is defined by [RFC 3986][rfc].
        ///
        /// [rfc]: https://www.rfc-editor.org/rfc/rfc3986#section-2.2
        fn sub_delimiter(&mut self) -> Result<u8> {
            match self.any() {
                ok @ Ok(
                    b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=',
                ) => ok,
                Ok(x) => {
                    self.cursor -= 1;
                    Err(self.expected("a path character", x))
                }
                Err(err) => Err(err),
            }
        }

        fn ws(&mut self) {
            while let Some(b' ' | b'\t') = self.peek() {
                self.cursor += 1;
            }
        }

        fn expected(&self, what: &'static str, actual: u8) -> ParseError {
            ParseError::Expected {
                expected: what,
                actual,
                pos: self.cursor,
            }
        }

        fn skip_while<P>(&mut self, predicate: P)
        where
            P: Fn(u8) -> bool,
        {
            while self.peek().is_some_and(&predicate) {
                self.cursor += 1;
            }
        }

        fn capture<F, T>(&mut self, parse: F) -> Result<(&'b [u8], T)>
        where
            F: FnOnce(&mut Self) -> Result<T>,
        {
            let bytes = self.bytes;
            let start = self.cursor;
            let x = parse(self)?;
            Ok((&bytes[start..self.cursor], x))
        }

        /// Consumes the next byte if it matches the expected value. Advances
        /// the cursor if successful, or returns a [`ParseError`] if the byte
        /// does not match or if the input ends unexpectedly.
        fn consume(&mut self, expected: u8) -> Result<u8> {
            match self.peek() {
                Some(x) if x == expected => {
                    self.cursor += 1;
                    Ok(x)
                }
                Some(x) => Err(ParseError::ExpectedExact {
                    expected,
                    actual: x,
                    pos: self.cursor,
                }),
                None => Err(ParseError::EndOfStream { pos: self.cursor }),
            }
        }

        /// Consumes and returns the next byte, advancing the cursor or returns
        /// a [`ParseError`] if the end of input is reached.
        fn any(&mut self) -> Result<u8> {
            match self.bytes.get(self.cursor).copied() {
                Some(x) => {
                    self.cursor += 1;
                    Ok(x)
                }
                None => Err(ParseError::EndOfStream { pos: self.cursor }),
            }
        }

        /// Peeks at the next byte without consuming it or returns [`None`] if
        /// the end of input is reached.
        fn peek(&self) -> Option<u8> {
            self.bytes.get(self.cursor).copied()
        }
    }

}
