// Statement access policy
//
// Decides whether a statement proposed by the agent may run. Layers, in
// order: single statement only, read-only restriction, schema-change
// restriction, protected tables, table allowlist.
//
// Statements are tokenized per dialect so comments, literals and quoted
// names are read the way the server reads them.

use super::Dialect;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    /// Identifier in backquotes, double quotes or brackets
    Quoted(String),
    Literal,
    Punct(char),
}

impl Token {
    fn is_word(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }

    fn name(&self) -> Option<&str> {
        match self {
            Token::Word(w) | Token::Quoted(w) => Some(w),
            _ => None,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Read up to the closing `close`; a doubled closing character stands for
/// itself. Returns the text and the index past the closing character.
fn read_quoted(chars: &[char], mut i: usize, close: char, backslash: bool) -> (String, usize) {
    let mut text = String::new();
    while i < chars.len() {
        let c = chars[i];
        if backslash && c == '\\' {
            if let Some(&escaped) = chars.get(i + 1) {
                text.push(escaped);
            }
            i += 2;
            continue;
        }
        if c == close {
            if chars.get(i + 1) == Some(&close) {
                text.push(close);
                i += 2;
                continue;
            }
            return (text, i + 1);
        }
        text.push(c);
        i += 1;
    }
    (text, i)
}

fn tokenize(sql: &str, dialect: Dialect) -> Vec<Token> {
    let mysql = dialect == Dialect::MySql;
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut in_versioned_comment = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            _ if c.is_whitespace() => i += 1,
            // MySQL only treats `-- ` as a comment when whitespace follows.
            '-' if next == Some('-')
                && (!mysql || chars.get(i + 2).map_or(true, |c| c.is_whitespace())) =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '#' if mysql => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            // MySQL executes the body of `/*! ... */`.
            '/' if next == Some('*') && mysql && chars.get(i + 2) == Some(&'!') => {
                i += 3;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                in_versioned_comment = true;
            }
            '*' if next == Some('/') && in_versioned_comment => {
                in_versioned_comment = false;
                i += 2;
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '\'' => {
                let (_, end) = read_quoted(&chars, i + 1, '\'', mysql);
                tokens.push(Token::Literal);
                i = end;
            }
            '"' | '`' => {
                let (name, end) = read_quoted(&chars, i + 1, c, mysql && c == '"');
                tokens.push(Token::Quoted(name));
                i = end;
            }
            '[' if !mysql => {
                let (name, end) = read_quoted(&chars, i + 1, ']', false);
                tokens.push(Token::Quoted(name));
                i = end;
            }
            _ if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            _ => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
        }
    }
    tokens
}

fn first_word(tokens: &[Token]) -> &str {
    tokens
        .iter()
        .find_map(|t| match t {
            Token::Word(w) => Some(w.as_str()),
            _ => None,
        })
        .unwrap_or("")
}

/// More than one statement: anything but another `;` after the first `;`.
fn has_multiple_statements(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .skip_while(|t| !t.is_punct(';'))
        .any(|t| !t.is_punct(';'))
}

/// A data-changing keyword outside parentheses, e.g. the DELETE closing
/// `WITH x AS (...) DELETE ...` or `SELECT ... INTO OUTFILE`.
fn writes_at_top_level(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    let mut previous: Option<&str> = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => depth = depth.saturating_sub(1),
            Token::Word(word) if depth == 0 => {
                let call = tokens.get(i + 1).is_some_and(|t| t.is_punct('('));
                let writes = match word.to_ascii_uppercase().as_str() {
                    "INSERT" | "DELETE" | "REPLACE" => !call,
                    // SELECT ... FOR UPDATE only takes row locks.
                    "UPDATE" => !call && !previous.is_some_and(|p| p.eq_ignore_ascii_case("FOR")),
                    "INTO" => true,
                    _ => false,
                };
                if writes {
                    return true;
                }
                previous = Some(word.as_str());
            }
            _ => {}
        }
    }
    false
}

/// Broad class of a SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
    Schema,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str, dialect: Dialect) -> Self {
        Self::of_tokens(&tokenize(sql, dialect))
    }

    fn of_tokens(tokens: &[Token]) -> Self {
        match first_word(tokens).to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" | "VALUES" | "EXPLAIN" => {
                if writes_at_top_level(tokens) {
                    StatementKind::Write
                } else {
                    StatementKind::Read
                }
            }
            "SHOW" | "DESCRIBE" | "DESC" => StatementKind::Read,
            // `PRAGMA name = value` changes settings.
            "PRAGMA" if tokens.iter().any(|t| t.is_punct('=')) => StatementKind::Write,
            "PRAGMA" => StatementKind::Read,
            "INSERT" | "UPDATE" | "DELETE" | "REPLACE" => StatementKind::Write,
            "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" => StatementKind::Schema,
            _ => StatementKind::Other,
        }
    }

    pub fn returns_rows(&self) -> bool {
        matches!(self, StatementKind::Read)
    }
}

/// Words that end a table list or cannot be a bare table name
const CLAUSE_WORDS: &[&str] = &[
    "AS", "CROSS", "DEFAULT", "EXCEPT", "FOR", "FORCE", "FROM", "FULL", "GROUP", "HAVING",
    "IGNORE", "INDEXED", "INNER", "INTERSECT", "INTO", "JOIN", "LATERAL", "LEFT", "LIMIT", "LOCK",
    "NATURAL", "NOT", "OFFSET", "ON", "ORDER", "OUTER", "PARTITION", "RETURNING", "RIGHT",
    "SELECT", "SET", "STRAIGHT_JOIN", "UNION", "USE", "USING", "VALUES", "WHERE", "WINDOW", "WITH",
];

/// Words that may sit between a keyword and its table
const TABLE_MODIFIERS: &[&str] = &[
    "ABORT", "DELAYED", "EXISTS", "FAIL", "HIGH_PRIORITY", "IF", "IGNORE", "INTO",
    "LOW_PRIORITY", "NOT", "OR", "QUICK", "REPLACE", "ROLLBACK",
];

/// Functions whose arguments use FROM, e.g. `EXTRACT(YEAR FROM d)`
const FROM_FUNCTIONS: &[&str] = &["EXTRACT", "OVERLAY", "POSITION", "SUBSTR", "SUBSTRING", "TRIM"];

fn is_one_of(word: &str, set: &[&str]) -> bool {
    set.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn table_name(token: &Token) -> Option<&str> {
    match token {
        Token::Word(w) if !is_one_of(w, CLAUSE_WORDS) && !w.chars().all(|c| c.is_ascii_digit()) => {
            Some(w)
        }
        Token::Quoted(q) => Some(q),
        _ => None,
    }
}

/// Table name at `i` with any schema prefix dropped, and the index after it
fn read_table(tokens: &[Token], i: usize) -> Option<(String, usize)> {
    let mut name = table_name(tokens.get(i)?)?.to_string();
    let mut next = i + 1;
    while tokens.get(next).is_some_and(|t| t.is_punct('.')) {
        match tokens.get(next + 1).and_then(Token::name) {
            Some(part) => {
                name = part.to_string();
                next += 2;
            }
            None => break,
        }
    }
    Some((name, next))
}

fn skip_modifiers(tokens: &[Token], mut i: usize) -> usize {
    while let Some(Token::Word(w)) = tokens.get(i) {
        if !is_one_of(w, TABLE_MODIFIERS) {
            break;
        }
        i += 1;
    }
    i
}

/// Index just past the group opened at `open`
fn after_group(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return j + 1;
            }
        }
    }
    tokens.len()
}

/// Tables starting at `i`. `list` follows commas (FROM, multi-table UPDATE
/// and DELETE); `parens` steps into `FROM (t)` and over derived tables.
fn collect_tables(
    tokens: &[Token],
    mut i: usize,
    list: bool,
    parens: bool,
    out: &mut Vec<String>,
) {
    loop {
        i = skip_modifiers(tokens, i);
        let open = i;
        while parens && tokens.get(i).is_some_and(|t| t.is_punct('(')) {
            i += 1;
        }
        let subquery = tokens
            .get(i)
            .is_some_and(|t| t.is_word("SELECT") || t.is_word("WITH") || t.is_word("VALUES"));
        if i > open && subquery {
            // Its own FROM clauses are collected separately.
            i = after_group(tokens, open);
        } else {
            let Some((name, next)) = read_table(tokens, i) else {
                return;
            };
            out.push(name);
            i = next;
        }
        if !list {
            return;
        }

        // alias
        match tokens.get(i) {
            Some(t) if t.is_word("AS") => i += 2,
            Some(t) if table_name(t).is_some() => i += 1,
            _ => {}
        }
        while tokens.get(i).is_some_and(|t| t.is_punct(')')) {
            i += 1;
        }
        if !tokens.get(i).is_some_and(|t| t.is_punct(',')) {
            return;
        }
        i += 1;
    }
}

fn tables_in(tokens: &[Token]) -> Vec<String> {
    let mut tables = Vec::new();
    // Word before each open parenthesis, to spot function calls
    let mut callers: Vec<Option<String>> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let previous = i.checked_sub(1).and_then(|p| tokens.get(p));
        match token {
            Token::Punct('(') => {
                callers.push(match previous {
                    Some(Token::Word(w)) => Some(w.to_ascii_uppercase()),
                    _ => None,
                });
            }
            Token::Punct(')') => {
                callers.pop();
            }
            Token::Word(word) => {
                let call = tokens.get(i + 1).is_some_and(|t| t.is_punct('('));
                match word.to_ascii_uppercase().as_str() {
                    "FROM" => {
                        let in_function = callers
                            .last()
                            .and_then(|c| c.as_deref())
                            .is_some_and(|c| FROM_FUNCTIONS.contains(&c));
                        if !in_function {
                            collect_tables(tokens, i + 1, true, true, &mut tables);
                        }
                    }
                    "JOIN" | "STRAIGHT_JOIN" => {
                        collect_tables(tokens, i + 1, false, true, &mut tables)
                    }
                    "INTO" | "TABLE" | "TRUNCATE" => {
                        collect_tables(tokens, i + 1, false, false, &mut tables)
                    }
                    "UPDATE" => {
                        // FOR UPDATE, ON DUPLICATE KEY UPDATE, DO UPDATE
                        let clause = previous.is_some_and(|p| {
                            p.is_word("FOR") || p.is_word("KEY") || p.is_word("DO")
                        });
                        if !call && !clause {
                            collect_tables(tokens, i + 1, true, false, &mut tables);
                        }
                    }
                    "DELETE" if !call => collect_tables(tokens, i + 1, true, false, &mut tables),
                    "INSERT" | "REPLACE" if !call => {
                        collect_tables(tokens, i + 1, false, false, &mut tables)
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    tables.sort_by_key(|t| t.to_ascii_lowercase());
    tables.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    tables
}

/// Tables a statement reads or writes, from FROM / JOIN / INTO / UPDATE /
/// DELETE / TABLE clauses. Quotes and schema prefixes are stripped.
pub fn referenced_tables(sql: &str, dialect: Dialect) -> Vec<String> {
    tables_in(&tokenize(sql, dialect))
}

/// Outcome of a policy check
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// What the agent is allowed to run
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub read_only: bool,
    pub allow_schema_changes: bool,
    pub allowed_tables: Option<Vec<String>>,
    /// Readable, but only changed through the typed order tools
    pub protected_tables: Vec<String>,
    pub dialect: Dialect,
}

impl AccessPolicy {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    pub fn with_allowed_tables(mut self, tables: Vec<String>) -> Self {
        self.allowed_tables = Some(tables);
        self
    }

    pub fn with_schema_changes(mut self, allow: bool) -> Self {
        self.allow_schema_changes = allow;
        self
    }

    pub fn with_protected_tables(mut self, tables: Vec<String>) -> Self {
        self.protected_tables = tables;
        self
    }

    pub fn for_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// True when checks get sharper with the database's table list
    pub fn uses_catalog(&self) -> bool {
        self.allowed_tables.is_some() || !self.protected_tables.is_empty()
    }

    pub fn check(&self, sql: &str) -> PolicyDecision {
        self.check_with_catalog(sql, &[])
    }

    /// Like `check`, but any name in `known_tables` that appears in the
    /// statement also counts as a table it touches, wherever it appears.
    pub fn check_with_catalog(&self, sql: &str, known_tables: &[String]) -> PolicyDecision {
        let tokens = tokenize(sql, self.dialect);
        if tokens.is_empty() {
            return PolicyDecision::Deny("Empty statement".to_string());
        }

        if has_multiple_statements(&tokens) {
            return PolicyDecision::Deny(
                "Only one SQL statement may be executed at a time".to_string(),
            );
        }

        let kind = StatementKind::of_tokens(&tokens);
        match kind {
            StatementKind::Read => {}
            _ if self.read_only => {
                return PolicyDecision::Deny(
                    "The database is read-only; only SELECT queries are allowed".to_string(),
                );
            }
            StatementKind::Schema if !self.allow_schema_changes => {
                return PolicyDecision::Deny(
                    "Schema changes (CREATE/DROP/ALTER/TRUNCATE) are not allowed".to_string(),
                );
            }
            StatementKind::Other => {
                return PolicyDecision::Deny(format!(
                    "Unsupported statement '{}'",
                    first_word(&tokens)
                ));
            }
            _ => {}
        }

        let mut touched = tables_in(&tokens);
        for table in known_tables {
            let named = tokens
                .iter()
                .filter_map(Token::name)
                .any(|n| n.eq_ignore_ascii_case(table));
            if named && !touched.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                touched.push(table.clone());
            }
        }

        if kind != StatementKind::Read {
            let protected: Vec<&str> = touched
                .iter()
                .filter(|t| self.protected_tables.iter().any(|p| p.eq_ignore_ascii_case(t)))
                .map(String::as_str)
                .collect();
            if !protected.is_empty() {
                return PolicyDecision::Deny(format!(
                    "Direct changes to {} are not allowed; use the order tools to place, \
                     update, deliver, cancel or return orders",
                    protected.join(", ")
                ));
            }
        }

        if let Some(allowed) = &self.allowed_tables {
            let outside: Vec<&str> = touched
                .iter()
                .filter(|t| !allowed.iter().any(|a| a.eq_ignore_ascii_case(t)))
                .map(String::as_str)
                .collect();
            if !outside.is_empty() {
                return PolicyDecision::Deny(format!(
                    "Only these tables may be used: {}. Refused: {}",
                    allowed.join(", "),
                    outside.join(", ")
                ));
            }
        }

        PolicyDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(sql: &str) -> StatementKind {
        StatementKind::classify(sql, Dialect::Sqlite)
    }

    fn tables(sql: &str) -> Vec<String> {
        referenced_tables(sql, Dialect::Sqlite)
    }

    fn multiple(sql: &str) -> bool {
        has_multiple_statements(&tokenize(sql, Dialect::Sqlite))
    }

    #[test]
    fn test_classify_skips_comments() {
        assert_eq!(kind("  select 1"), StatementKind::Read);
        assert_eq!(kind("-- list\n/* all */ SELECT * FROM t"), StatementKind::Read);
        assert_eq!(kind("WITH x AS (SELECT 1) SELECT * FROM x"), StatementKind::Read);
        assert_eq!(kind("update t set a=1"), StatementKind::Write);
        assert_eq!(kind("DROP TABLE t"), StatementKind::Schema);
        assert_eq!(kind("GRANT ALL"), StatementKind::Other);
        assert_eq!(kind(""), StatementKind::Other);
    }

    #[test]
    fn test_classify_finds_writes_after_cte() {
        assert_eq!(
            kind("WITH x AS (SELECT 1) DELETE FROM orders_2"),
            StatementKind::Write
        );
        assert_eq!(
            kind("with recent as (select * from t) update t set a = 1"),
            StatementKind::Write
        );
        assert_eq!(
            kind("WITH x AS (SELECT 'DELETE') SELECT REPLACE(a, 'b', 'c') FROM x"),
            StatementKind::Read
        );
        assert_eq!(kind("SELECT * FROM t FOR UPDATE"), StatementKind::Read);
        assert_eq!(
            StatementKind::classify("SELECT * FROM t INTO OUTFILE '/tmp/t'", Dialect::MySql),
            StatementKind::Write
        );
        assert_eq!(kind("PRAGMA table_info(t)"), StatementKind::Read);
        assert_eq!(kind("PRAGMA user_version = 3"), StatementKind::Write);
    }

    #[test]
    fn test_classify_reads_mysql_comments() {
        // MySQL runs versioned comments and ends `#` comments at the newline.
        let versioned = "WITH x AS (SELECT 1) /*!80000 DELETE FROM t */";
        assert_eq!(
            StatementKind::classify(versioned, Dialect::MySql),
            StatementKind::Write
        );
        assert_eq!(
            StatementKind::classify("SELECT 1 # DELETE FROM t", Dialect::MySql),
            StatementKind::Read
        );
        // A backslash escapes the quote in MySQL but not in SQLite.
        let sql = r"WITH x AS (SELECT 'a\') DELETE FROM t WHERE 'b\' = 1";
        assert_eq!(StatementKind::classify(sql, Dialect::Sqlite), StatementKind::Write);
    }

    #[test]
    fn test_multiple_statements() {
        assert!(!multiple("SELECT 1;"));
        assert!(!multiple("SELECT 1;  -- done"));
        assert!(!multiple("SELECT ';' FROM t"));
        assert!(multiple("SELECT 1; DROP TABLE t"));
        assert!(multiple("SELECT 1 -- it's\n; DELETE FROM t"));
    }

    #[test]
    fn test_referenced_tables() {
        assert_eq!(
            tables("SELECT o.* FROM `orders_2` o JOIN super_market.returns r ON r.id = o.id"),
            vec!["orders_2".to_string(), "returns".to_string()]
        );
        assert_eq!(
            tables("insert into Orders_2 (a) values (1)"),
            vec!["Orders_2".to_string()]
        );
        assert_eq!(
            tables("SELECT * FROM a, b AS x, [c] WHERE a.id = x.id"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(tables("SELECT * FROM(b)"), vec!["b".to_string()]);
        assert_eq!(
            tables("SELECT * FROM (SELECT id FROM t) s, u"),
            vec!["t".to_string(), "u".to_string()]
        );
        assert_eq!(
            tables("SELECT EXTRACT(YEAR FROM d), REPLACE(n, 'a', 'b') FROM t"),
            vec!["t".to_string()]
        );
        assert_eq!(
            tables("INSERT OR REPLACE INTO t VALUES (1) ON CONFLICT(id) DO UPDATE SET a = 2"),
            vec!["t".to_string()]
        );
        assert_eq!(
            tables("UPDATE/**/orders_2 SET a = 1"),
            vec!["orders_2".to_string()]
        );
    }

    #[test]
    fn test_read_only_denies_writes() {
        let policy = AccessPolicy::read_only();
        assert!(policy.check("SELECT * FROM students").is_allowed());
        assert!(!policy.check("DELETE FROM students").is_allowed());
        assert!(!policy.check("CREATE TABLE x (a int)").is_allowed());
        assert!(!policy
            .check("WITH x AS (SELECT 1) DELETE FROM students")
            .is_allowed());
    }

    #[test]
    fn test_schema_changes_need_opt_in() {
        let policy = AccessPolicy::default();
        assert!(policy.check("UPDATE t SET a = 1").is_allowed());
        assert!(!policy.check("DROP TABLE t").is_allowed());
        assert!(policy
            .with_schema_changes(true)
            .check("DROP TABLE t")
            .is_allowed());
    }

    #[test]
    fn test_allowlist() {
        let policy = AccessPolicy::default().with_allowed_tables(vec!["orders_2".to_string()]);
        assert!(policy
            .check("UPDATE ORDERS_2 SET Delivered = 'YES' WHERE Customer_ID = 'C-1'")
            .is_allowed());
        for sql in [
            "SELECT * FROM orders_2 JOIN regional_managers USING (Region)",
            "SELECT * FROM orders_2, regional_managers",
            "SELECT * FROM(regional_managers)",
            "SELECT * FROM orders_2 o, `regional_managers` m WHERE o.Region = m.Region",
        ] {
            match policy.check(sql) {
                PolicyDecision::Deny(reason) => assert!(reason.contains("regional_managers")),
                PolicyDecision::Allow => panic!("{} must be denied", sql),
            }
        }
    }

    #[test]
    fn test_allowlist_with_catalog_catches_any_mention() {
        let policy = AccessPolicy::default().with_allowed_tables(vec!["orders_2".to_string()]);
        let catalog = vec!["orders_2".to_string(), "payroll".to_string()];
        let sql = "SELECT payroll.Salary FROM orders_2";
        assert!(policy.check(sql).is_allowed());
        assert!(!policy.check_with_catalog(sql, &catalog).is_allowed());
        assert!(policy
            .check_with_catalog("SELECT 'payroll' FROM orders_2", &catalog)
            .is_allowed());
    }

    #[test]
    fn test_protected_tables_refuse_raw_writes() {
        let policy =
            AccessPolicy::default().with_protected_tables(vec!["orders_2".to_string()]);
        assert!(policy.check("SELECT * FROM orders_2").is_allowed());
        assert!(policy.check("UPDATE notes SET a = 1").is_allowed());
        for sql in [
            "UPDATE orders_2 SET Delivered = 'RETURNED' WHERE Customer_ID = 'C-7'",
            "DELETE FROM `orders_2`",
            "INSERT INTO main.orders_2 (Customer_ID) VALUES ('C-8')",
            "WITH x AS (SELECT 1) UPDATE orders_2 SET Quantity = 9",
        ] {
            match policy.check(sql) {
                PolicyDecision::Deny(reason) => assert!(reason.contains("order tools")),
                PolicyDecision::Allow => panic!("{} must be denied", sql),
            }
        }
    }

    #[test]
    fn test_rejects_empty_and_stacked() {
        let policy = AccessPolicy::default();
        assert!(!policy.check("   ").is_allowed());
        assert!(!policy.check("-- nothing").is_allowed());
        assert!(!policy.check("SELECT 1; SELECT 2").is_allowed());
    }
}
