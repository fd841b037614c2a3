use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::{GrammarError, Result};

/// Name of the implicit entry point of every grammar
pub const START_SYMBOL: &str = "start";

/// Default ceiling for the expansion depth counter
pub const DEFAULT_MAX_DEPTH: usize = 800;

/// Mapping from non-terminal name to its alternatives
pub type Rules = BTreeMap<String, Vec<Production>>;

fn non_terminal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^<.*>$").expect("non-terminal pattern is a valid regex"))
}

/// A single token of a production, either a terminal or a non-terminal reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol<'a> {
    /// Literal text, emitted verbatim
    Terminal(&'a str),
    /// Reference to another rule, without the angle brackets
    NonTerminal(&'a str),
}

impl<'a> Symbol<'a> {
    /// Classify a whitespace-free token.
    ///
    /// A token wrapped in `<...>` is a non-terminal; the name is the token with
    /// every leading `<` and trailing `>` removed.
    pub fn classify(token: &'a str) -> Self {
        if non_terminal_pattern().is_match(token) {
            Symbol::NonTerminal(token.trim_matches(|c| c == '<' || c == '>'))
        } else {
            Symbol::Terminal(token)
        }
    }
}

/// One alternative replacement string bound to a non-terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    text: String,
}

impl Production {
    pub fn new(text: impl Into<String>) -> Self {
        Production { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The whitespace-separated symbols of this production
    pub fn symbols(&self) -> impl Iterator<Item = Symbol<'_>> {
        self.text.split_whitespace().map(Symbol::classify)
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Configuration options for grammar behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrammarConfig {
    /// Ceiling for the per-run depth counter
    pub max_depth: usize,
    /// Whether to trim whitespace from output
    pub trim_output: bool,
    /// Fail instead of passing a reference through when its rule is missing
    pub strict_references: bool,
    /// Upper bound on concurrent batch workers, defaults to the available parallelism
    pub max_workers: Option<usize>,
    /// Seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            trim_output: true,
            strict_references: false,
            max_workers: None,
            seed: None,
        }
    }
}

impl GrammarConfig {
    /// Parse a configuration from JSON, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of batch workers to use, never zero
    pub fn worker_limit(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Per-run mutable expansion state
#[derive(Debug, Default)]
pub struct ExpansionContext {
    depth: usize,
}

impl ExpansionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of symbols expanded below the root so far
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A compiled rule table. Immutable once built and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The rules mapping non-terminals to productions
    rules: Rules,
    /// The starting symbol for generation
    start_symbol: String,
    /// Configuration options
    config: GrammarConfig,
}

#[derive(Default)]
struct RuleBlock {
    name: Option<String>,
    productions: Vec<Production>,
}

impl Grammar {
    fn empty() -> Self {
        Grammar {
            rules: Rules::new(),
            start_symbol: START_SYMBOL.to_string(),
            config: GrammarConfig::default(),
        }
    }

    /// Parse grammar text into a rule table without validating it.
    ///
    /// Blocks missing a name or any production are dropped silently. When two
    /// blocks name the same non-terminal the later one replaces the earlier.
    pub fn parse(text: &str) -> Self {
        let mut grammar = Grammar::empty();
        let mut block: Option<RuleBlock> = None;
        let mut dropped = 0usize;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line {
                "{" => block = Some(RuleBlock::default()),
                "}" => match block.take() {
                    Some(RuleBlock {
                        name: Some(name),
                        productions,
                    }) if !productions.is_empty() => {
                        grammar.rules.insert(name, productions);
                    }
                    Some(_) => dropped += 1,
                    None => {}
                },
                _ => {
                    let Some(current) = block.as_mut() else {
                        continue;
                    };
                    if let Symbol::NonTerminal(name) = Symbol::classify(line) {
                        if current.name.is_none() {
                            current.name = Some(name.to_string());
                        }
                    } else if let Some(body) = line.strip_suffix(';') {
                        let body = body.trim();
                        if !body.is_empty() {
                            current.productions.push(Production::new(body));
                        }
                    }
                }
            }
        }

        debug!(
            rules = grammar.rules.len(),
            dropped, "parsed grammar rule blocks"
        );
        grammar
    }

    /// Parse and validate grammar text
    pub fn compile(text: &str) -> Result<Self> {
        let grammar = Self::parse(text);
        if grammar.rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        grammar.validate()?;
        Ok(grammar)
    }

    /// Read and compile a grammar file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::compile(&text)
    }

    /// Build a grammar from an existing rule table without validating it.
    ///
    /// Blank productions and rules left without alternatives are discarded,
    /// the same way the parser treats them. Runs of whitespace inside an
    /// alternative, line breaks included, collapse to a single space.
    pub fn from_rules<I, S, P>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<P>)>,
        S: Into<String>,
        P: AsRef<str>,
    {
        let mut grammar = Grammar::empty();
        for (name, alternatives) in rules {
            let productions: Vec<Production> = alternatives
                .iter()
                .map(|p| p.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|p| !p.is_empty())
                .map(Production::new)
                .collect();
            if !productions.is_empty() {
                grammar.rules.insert(name.into(), productions);
            }
        }
        grammar
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    /// Check that every referenced non-terminal has a rule.
    ///
    /// Rules are visited in name order, so the reported name is stable.
    pub fn validate(&self) -> Result<()> {
        for productions in self.rules.values() {
            for production in productions {
                for symbol in production.symbols() {
                    if let Symbol::NonTerminal(name) = symbol {
                        if !self.rules.contains_key(name) {
                            return Err(GrammarError::UndefinedNonTerminal(name.to_string()));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Generate one text from the start symbol
    pub fn run(&self) -> Result<String> {
        self.run_at(0)
    }

    /// Run `offset` of a batch: seeded from the configured seed, or drawn
    /// from the thread-local source when no seed is set
    pub(crate) fn run_at(&self, offset: u64) -> Result<String> {
        match self.seeded_rng(offset) {
            Some(mut rng) => self.run_with(&mut rng),
            None => self.run_with(&mut rand::thread_rng()),
        }
    }

    /// Generate one text from the start symbol using the given random source
    pub fn run_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        if self.rules.is_empty() {
            return Err(GrammarError::Uninitialized);
        }

        let root = format!("<{}>", self.start_symbol);
        let mut ctx = ExpansionContext::new();
        let text = self.expand(&root, &mut ctx, rng)?;
        let text = if self.config.trim_output {
            text.trim().to_string()
        } else {
            text
        };

        if text.is_empty() {
            return Err(GrammarError::EmptyOutput);
        }
        Ok(text)
    }

    /// Rewrite `symbol` into terminal text.
    ///
    /// Pending symbols are kept on an explicit stack and expanded left to right.
    /// Every symbol taken from a chosen production bumps the context's depth
    /// counter; a non-terminal met while the counter is above the configured
    /// ceiling aborts the expansion.
    pub fn expand<'a, R: Rng + ?Sized>(
        &'a self,
        symbol: &'a str,
        ctx: &mut ExpansionContext,
        rng: &mut R,
    ) -> Result<String> {
        let mut pending: Vec<&'a str> = Vec::new();
        let mut output: Vec<&'a str> = Vec::new();

        self.rewrite(symbol, ctx, rng, &mut pending, &mut output)?;
        while let Some(token) = pending.pop() {
            ctx.depth += 1;
            self.rewrite(token, ctx, rng, &mut pending, &mut output)?;
        }

        Ok(output.join(" "))
    }

    fn rewrite<'a, R: Rng + ?Sized>(
        &'a self,
        token: &'a str,
        ctx: &ExpansionContext,
        rng: &mut R,
        pending: &mut Vec<&'a str>,
        output: &mut Vec<&'a str>,
    ) -> Result<()> {
        let name = match Symbol::classify(token) {
            Symbol::Terminal(text) => {
                output.push(text);
                return Ok(());
            }
            Symbol::NonTerminal(name) => name,
        };

        let Some(productions) = self.rules.get(name).filter(|p| !p.is_empty()) else {
            if self.config.strict_references {
                return Err(GrammarError::UnknownNonTerminal(name.to_string()));
            }
            warn!(non_terminal = name, "no production rules found, emitting symbol as text");
            output.push(token);
            return Ok(());
        };

        if ctx.depth > self.config.max_depth {
            return Err(GrammarError::RecursionDepthExceeded {
                limit: self.config.max_depth,
            });
        }

        let production = &productions[rng.gen_range(0..productions.len())];
        pending.extend(production.as_str().split_whitespace().rev());
        Ok(())
    }

    /// Reproducible source for the run at `offset` within a batch, if seeded
    pub(crate) fn seeded_rng(&self, offset: u64) -> Option<StdRng> {
        self.config
            .seed
            .map(|seed| StdRng::seed_from_u64(seed.wrapping_add(offset)))
    }

    /// Render the rule table back into block syntax
    pub fn to_block_text(&self) -> String {
        let mut text = String::new();
        for (name, productions) in &self.rules {
            text.push_str("{\n<");
            text.push_str(name);
            text.push_str(">\n");
            for production in productions {
                text.push_str(production.as_str());
                text.push_str(";\n");
            }
            text.push_str("}\n");
        }
        text
    }

    /// Check if the grammar contains a specific non-terminal
    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Get a reference to the grammar's rules
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Get a reference to the grammar's configuration
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }
}
