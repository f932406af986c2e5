use std::fmt;

/// Configuration of relationship verification
pub struct Settings {
    /// Record relationships as snippets that can be cached (`-XX:+ClassRelationshipVerifier`)
    ///
    /// When this is off, relationships are resolved (or deferred) as soon as they are discovered.
    pub class_relationship_verifier: bool,

    /// Don't use the shared cache for snippets (`-XX:+ClassRelationshipVerifierIgnoreSCC`)
    ///
    /// Relationships still get deferred, they just always get rediscovered by walking bytecode.
    pub ignore_shared_cache: bool,

    /// Verify everything eagerly (`-Xverify:all` or `-Xfuture`)
    ///
    /// This is incompatible with deferring relationships.
    pub verify_all: bool,

    /// Largest number of snippets for which written names are tracked by scanning an array
    ///
    /// Past this, a hash table is used instead.
    pub dedup_linear_threshold: usize,
}

impl Settings {
    pub const DEFAULT_DEDUP_LINEAR_THRESHOLD: usize = 32;

    pub fn new() -> Settings {
        Settings {
            class_relationship_verifier: false,
            ignore_shared_cache: false,
            verify_all: false,
            dedup_linear_threshold: Settings::DEFAULT_DEDUP_LINEAR_THRESHOLD,
        }
    }

    /// Settings with the relationship verifier enabled
    pub fn enabled() -> Settings {
        Settings {
            class_relationship_verifier: true,
            ..Settings::new()
        }
    }

    /// Should snippets go through the shared cache (for classes that are in it)?
    pub fn caches_snippets(&self) -> bool {
        self.class_relationship_verifier && !self.ignore_shared_cache
    }

    /// Parse VM-style command line options
    ///
    /// Options that don't concern verification are skipped. For each `+`/`-` pair, the right-most
    /// occurrence wins. A bare `-Xverify` resets any `-Xverify:<opt>` to its left.
    pub fn from_options<'o, I>(options: I) -> Result<Settings, SettingsError>
    where
        I: IntoIterator<Item = &'o str>,
    {
        let mut settings = Settings::new();

        let mut verifier: Option<usize> = None;
        let mut no_verifier: Option<usize> = None;
        let mut ignore_scc: Option<usize> = None;
        let mut no_ignore_scc: Option<usize> = None;
        let mut verify_options: Vec<&'o str> = vec![];
        let mut future = false;

        for (idx, option) in options.into_iter().enumerate() {
            match option {
                "-XX:+ClassRelationshipVerifier" => verifier = Some(idx),
                "-XX:-ClassRelationshipVerifier" => no_verifier = Some(idx),
                "-XX:+ClassRelationshipVerifierIgnoreSCC" => ignore_scc = Some(idx),
                "-XX:-ClassRelationshipVerifierIgnoreSCC" => no_ignore_scc = Some(idx),
                "-Xfuture" => future = true,
                "-Xverify" => verify_options.clear(),
                _ => {
                    if let Some(values) = option.strip_prefix("-Xverify:") {
                        verify_options.push(values);
                    }
                }
            }
        }

        for values in verify_options {
            if values.is_empty() {
                return Err(SettingsError::EmptyVerifyOptions);
            }
            for verify_option in values.split(',') {
                settings.verify_all |= parse_verify_option(verify_option)?;
            }
        }
        settings.verify_all |= future;

        if verifier > no_verifier {
            if settings.verify_all {
                return Err(SettingsError::IncompatibleOption(
                    "-XX:+ClassRelationshipVerifier",
                ));
            }
            settings.class_relationship_verifier = true;
        }

        // Only takes effect if it is to the right of every verifier option
        if ignore_scc > no_ignore_scc && ignore_scc > verifier && ignore_scc > no_verifier {
            if settings.verify_all {
                return Err(SettingsError::IncompatibleOption(
                    "-XX:+ClassRelationshipVerifierIgnoreSCC",
                ));
            }
            if verifier.is_none() {
                settings.class_relationship_verifier = true;
            }
            settings.ignore_shared_cache = true;
        }

        log::debug!(
            "Relationship verifier: enabled={}, ignore_shared_cache={}, verify_all={}",
            settings.class_relationship_verifier,
            settings.ignore_shared_cache,
            settings.verify_all
        );
        Ok(settings)
    }
}

/// Parse one `-Xverify:<opt>`, returning whether it requests verifying everything
fn parse_verify_option(verify_option: &str) -> Result<bool, SettingsError> {
    match verify_option {
        "all" => Ok(true),
        "none" | "opt" | "noopt" | "nofallback" | "ignorestackmaps" | "bootclasspathstatic"
        | "doProtectedAccessCheck" => Ok(false),
        _ if verify_option.starts_with("excludeattribute=") => Ok(false),
        _ => Err(SettingsError::UnrecognisedVerifyOption(String::from(
            verify_option,
        ))),
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}

/// Invalid combination of options
#[derive(Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// Option can't be combined with `-Xverify:all` or `-Xfuture`
    IncompatibleOption(&'static str),

    /// `-Xverify:` without any options
    EmptyVerifyOptions,

    UnrecognisedVerifyOption(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IncompatibleOption(option) => write!(
                f,
                "{} cannot be used if -Xfuture or if -Xverify:all is enabled",
                option
            ),
            SettingsError::EmptyVerifyOptions => {
                f.write_str("No options specified for -Xverify:<opt>")
            }
            SettingsError::UnrecognisedVerifyOption(option) => {
                write!(f, "Unrecognised option '{}' for -Xverify:<opt>", option)
            }
        }
    }
}
