#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 7
    /// ```
    Integer(i64),

    /// Number with a fractional part
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// String literal enclosed in double quotes, contents taken verbatim
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// "2021-6-1"
    /// ```
    String(String),

    /// Property path or function name
    ///
    /// Dot-joined segments, each a bare identifier or a single-quoted run of
    /// arbitrary text. The literal text, quotes included, is kept as is.
    ///
    /// # Examples
    /// ```text
    /// city
    /// user.addr.city
    /// 'order+goo*and#stuff'
    /// 'Danube.Steamboat.Shipping.Company'.'the captain'.hat
    /// ```
    Symbol(String),

    // Arithmetic
    /// Addition or string concatenation
    Plus,

    /// Subtraction or unary minus
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Modulo
    Percent,

    /// Power
    Caret,

    // Comparison
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Regex match operator
    ///
    /// # Examples
    /// ```text
    /// name ~= "^fo+$"
    /// ```
    Match,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Keywords
    /// Logical AND (word, not symbol)
    And,

    /// Logical OR (word, not symbol)
    Or,

    /// Logical negation, also the prefix of `not in` and `not has`
    Not,

    /// Set membership
    ///
    /// # Examples
    /// ```text
    /// score in (60, 100)
    /// ```
    In,

    /// Collection or substring membership
    ///
    /// # Examples
    /// ```text
    /// tags has "red"
    /// ```
    Has,

    // Ternary
    /// Condition separator of `cond ? a : b`
    Question,

    /// Branch separator of `cond ? a : b`
    Colon,

    // Delimiters
    /// Left parenthesis for grouping, sets, arrays, and calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Comma for separating arguments or elements
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(n) => format!("number {}", n),
            Token::Float(n) => format!("number {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Symbol(s) => format!("symbol {}", s),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
            Token::Caret => "'^'".into(),
            Token::EqEq => "'=='".into(),
            Token::NotEq => "'!='".into(),
            Token::Match => "'~='".into(),
            Token::Lt => "'<'".into(),
            Token::Gt => "'>'".into(),
            Token::LtEq => "'<='".into(),
            Token::GtEq => "'>='".into(),
            Token::And => "'and'".into(),
            Token::Or => "'or'".into(),
            Token::Not => "'not'".into(),
            Token::In => "'in'".into(),
            Token::Has => "'has'".into(),
            Token::Question => "'?'".into(),
            Token::Colon => "':'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
            Token::Eof => "end of input".into(),
        }
    }
}
