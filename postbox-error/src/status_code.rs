use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных (идентификаторы, реестр)
/// - 6xxx: Доставка / ожидание
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>` для передачи кода по
/// проводу; `strum` и `serde_repr` подключаются фичей `extras`.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,

    // === 6xxx: Доставка ===
    ConnectionClosed = 6001,
    Timeout = 6002,
    Cancelled = 6008,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Имеет ли смысл повторить операцию (например, ожидание сообщения).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }

    /// Ошибка со стороны клиента: неверный запрос или неизвестный
    /// идентификатор.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        (2000..=2999).contains(&c) || matches!(self, Self::InvalidArgs)
    }

    /// Внутренняя ошибка сервера (1xxx, кроме `InvalidArgs`).
    pub fn is_server_error(&self) -> bool {
        let c = self.code();
        (1000..=1999).contains(&c) && !matches!(self, Self::InvalidArgs)
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists | Self::Cancelled => LogLevel::Debug,
            Self::InvalidArgs | Self::ConnectionClosed => LogLevel::Info,
            Self::Timeout => LogLevel::Warn,
            Self::Internal | Self::Unexpected | Self::Unknown => LogLevel::Error,
        }
    }

    /// HTTP-статус, соответствующий коду статуса.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::InvalidArgs => 400,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::Timeout => 408,
            Self::ConnectionClosed => 410,
            Self::Cancelled => 499,
            _ => 500,
        }
    }

    /// Числовой код gRPC (`google.rpc.Code`), соответствующий статусу.
    pub fn grpc_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgs => 3,
            Self::Timeout => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::ConnectionClosed => 9,
            Self::Internal | Self::Unexpected => 13,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
