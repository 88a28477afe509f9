/// Scripts Lua usados pelas operações condicionais de lock.
///
/// O cliente envia o texto completo via `EVAL`, o que funciona contra
/// qualquer servidor Redis. O servidor do StormCache não embute um
/// interpretador Lua: reconhece apenas estes scripts pelo texto e os executa
/// nativamente, de forma atômica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// `KEYS[1]` é removida se o valor atual for `ARGV[1]`. Retorna 1 ou 0.
    CompareAndDelete,
    /// `KEYS[1]` recebe TTL de `ARGV[2]` ms se o valor atual for `ARGV[1]`.
    /// Retorna 1 ou 0.
    CompareAndExpire,
}

const COMPARE_AND_DELETE: &str = "if redis.call('get', KEYS[1]) == ARGV[1] then \
return redis.call('del', KEYS[1]) else return 0 end";

const COMPARE_AND_EXPIRE: &str = "if redis.call('get', KEYS[1]) == ARGV[1] then \
return redis.call('pexpire', KEYS[1], ARGV[2]) else return 0 end";

impl Script {
    pub fn source(&self) -> &'static str {
        match self {
            Script::CompareAndDelete => COMPARE_AND_DELETE,
            Script::CompareAndExpire => COMPARE_AND_EXPIRE,
        }
    }

    /// Número de argumentos (`ARGV`) que o script espera.
    pub fn arity(&self) -> usize {
        match self {
            Script::CompareAndDelete => 1,
            Script::CompareAndExpire => 2,
        }
    }

    /// Identifica um script conhecido pelo texto (espaços nas pontas ignorados).
    pub fn from_source(source: &str) -> Option<Script> {
        let source = source.trim();
        [Script::CompareAndDelete, Script::CompareAndExpire]
            .into_iter()
            .find(|s| s.source() == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_scripts_are_recognized() {
        assert_eq!(
            Script::from_source(COMPARE_AND_DELETE),
            Some(Script::CompareAndDelete)
        );
        let padded = format!("  {COMPARE_AND_EXPIRE}\n");
        assert_eq!(Script::from_source(&padded), Some(Script::CompareAndExpire));
    }

    #[test]
    fn unknown_script_is_rejected() {
        assert_eq!(Script::from_source("return redis.call('flushall')"), None);
    }
}
