use serde::{Deserialize, Serialize};

/// Valor de aplicação como visto na fronteira de encoding.
///
/// `Undefined` é o sentinela explícito de "valor indefinido armazenado", que
/// precisa sobreviver ao round-trip sem se confundir com um valor nulo
/// (`Defined(None)`, `Defined(())`) nem com a ausência da chave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot<T> {
    Undefined,
    Defined(T),
}

impl<T> Slot<T> {
    pub fn is_defined(&self) -> bool {
        matches!(self, Slot::Defined(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Slot<U> {
        match self {
            Slot::Undefined => Slot::Undefined,
            Slot::Defined(v) => Slot::Defined(f(v)),
        }
    }

    /// Descarta a distinção entre indefinido e ausente.
    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Undefined => None,
            Slot::Defined(v) => Some(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_not_defined() {
        let slot: Slot<i32> = Slot::Undefined;
        assert!(!slot.is_defined());
        assert_eq!(slot.into_option(), None);
    }

    #[test]
    fn defined_null_stays_defined() {
        let slot: Slot<Option<String>> = Slot::Defined(None);
        assert!(slot.is_defined());
        assert_eq!(slot.into_option(), Some(None));
    }

    #[test]
    fn map_preserves_variant() {
        assert_eq!(Slot::Defined(2).map(|n| n * 10), Slot::Defined(20));
        assert_eq!(Slot::<i32>::Undefined.map(|n| n * 10), Slot::Undefined);
    }
}
