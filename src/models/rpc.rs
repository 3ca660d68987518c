// models/rpc.rs
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::repository::RepositoryError;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    CheckPerformTransaction,
    CreateTransaction,
    PerformTransaction,
    CancelTransaction,
    CheckTransaction,
    GetStatement,
    ChangePassword,
}

impl RpcMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "CheckPerformTransaction" => Some(RpcMethod::CheckPerformTransaction),
            "CreateTransaction" => Some(RpcMethod::CreateTransaction),
            "PerformTransaction" => Some(RpcMethod::PerformTransaction),
            "CancelTransaction" => Some(RpcMethod::CancelTransaction),
            "CheckTransaction" => Some(RpcMethod::CheckTransaction),
            "GetStatement" => Some(RpcMethod::GetStatement),
            "ChangePassword" => Some(RpcMethod::ChangePassword),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RpcMethod::CheckPerformTransaction => "CheckPerformTransaction",
            RpcMethod::CreateTransaction => "CreateTransaction",
            RpcMethod::PerformTransaction => "PerformTransaction",
            RpcMethod::CancelTransaction => "CancelTransaction",
            RpcMethod::CheckTransaction => "CheckTransaction",
            RpcMethod::GetStatement => "GetStatement",
            RpcMethod::ChangePassword => "ChangePassword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalizedMessage {
    pub uz: &'static str,
    pub ru: &'static str,
    pub en: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    InvalidHttpMethod,
    MethodNotFound,
    InvalidParams,
    InternalError,
    InvalidAuthorization,
    InvalidAmount,
    TransactionNotFound,
    OrderCompleted,
    UnableToPerform,
    InvalidAccount,
    AccountBlocked,
    AccountProcessing,
    MerchantNotFound,
    InvalidFieldValue,
    AmountTooSmall,
    AmountTooLarge,
    MerchantServiceUnavailable,
    MerchantServiceIncorrect,
    CardError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 21] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::InvalidHttpMethod,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::InvalidAuthorization,
        ErrorCode::InvalidAmount,
        ErrorCode::TransactionNotFound,
        ErrorCode::OrderCompleted,
        ErrorCode::UnableToPerform,
        ErrorCode::InvalidAccount,
        ErrorCode::AccountBlocked,
        ErrorCode::AccountProcessing,
        ErrorCode::MerchantNotFound,
        ErrorCode::InvalidFieldValue,
        ErrorCode::AmountTooSmall,
        ErrorCode::AmountTooLarge,
        ErrorCode::MerchantServiceUnavailable,
        ErrorCode::MerchantServiceIncorrect,
        ErrorCode::CardError,
    ];

    pub fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::InvalidHttpMethod => -32300,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::InvalidAuthorization => -32504,
            ErrorCode::InvalidAmount => -31001,
            ErrorCode::TransactionNotFound => -31003,
            ErrorCode::OrderCompleted => -31007,
            ErrorCode::UnableToPerform => -31008,
            ErrorCode::InvalidAccount => -31050,
            ErrorCode::AccountBlocked => -31051,
            ErrorCode::AccountProcessing => -31099,
            ErrorCode::MerchantNotFound => -31601,
            ErrorCode::InvalidFieldValue => -31602,
            ErrorCode::AmountTooSmall => -31610,
            ErrorCode::AmountTooLarge => -31611,
            ErrorCode::MerchantServiceUnavailable => -31622,
            ErrorCode::MerchantServiceIncorrect => -31623,
            ErrorCode::CardError => -31630,
        }
    }

    pub fn message(self) -> LocalizedMessage {
        let (uz, ru, en) = match self {
            ErrorCode::ParseError => (
                "JSON so'rovni o'qib bo'lmadi",
                "Ошибка разбора JSON",
                "Parse error",
            ),
            ErrorCode::InvalidRequest => (
                "So'rov noto'g'ri tuzilgan",
                "Неверный запрос",
                "Invalid request",
            ),
            ErrorCode::InvalidHttpMethod => (
                "So'rov usuli POST bo'lishi kerak",
                "Метод запроса должен быть POST",
                "Request method must be POST",
            ),
            ErrorCode::MethodNotFound => (
                "Metod topilmadi",
                "Метод не найден",
                "Method not found",
            ),
            ErrorCode::InvalidParams => (
                "Parametrlar noto'g'ri",
                "Неверные параметры",
                "Invalid params",
            ),
            ErrorCode::InternalError => (
                "Ichki xatolik",
                "Внутренняя ошибка",
                "Internal error",
            ),
            ErrorCode::InvalidAuthorization => (
                "Metodni bajarish uchun huquq yetarli emas",
                "Недостаточно привилегий для выполнения метода",
                "Insufficient privileges to perform this method",
            ),
            ErrorCode::InvalidAmount => (
                "Noto'g'ri summa",
                "Неверная сумма",
                "Invalid amount",
            ),
            ErrorCode::TransactionNotFound => (
                "Tranzaksiya topilmadi",
                "Транзакция не найдена",
                "Transaction not found",
            ),
            ErrorCode::OrderCompleted => (
                "Buyurtma bajarilgan, tranzaksiyani bekor qilib bo'lmaydi",
                "Заказ выполнен. Невозможно отменить транзакцию",
                "Order completed. Unable to cancel transaction",
            ),
            ErrorCode::UnableToPerform => (
                "Ushbu amalni bajarib bo'lmaydi",
                "Невозможно выполнить данную операцию",
                "Unable to perform operation",
            ),
            ErrorCode::InvalidAccount => (
                "Hisob topilmadi",
                "Неверный счёт",
                "Invalid account",
            ),
            ErrorCode::AccountBlocked => (
                "Hisob bloklangan",
                "Счёт заблокирован",
                "Account is blocked",
            ),
            ErrorCode::AccountProcessing => (
                "Hisob bo'yicha to'lov amalga oshirilmoqda",
                "По счёту уже выполняется оплата",
                "A payment for this account is in progress",
            ),
            ErrorCode::MerchantNotFound => (
                "Kassa topilmadi",
                "Касса не найдена",
                "Merchant not found",
            ),
            ErrorCode::InvalidFieldValue => (
                "Maydon qiymati noto'g'ri",
                "Неверное значение поля",
                "Invalid field value",
            ),
            ErrorCode::AmountTooSmall => (
                "Summa ruxsat etilganidan kam",
                "Сумма меньше допустимой",
                "Amount is too small",
            ),
            ErrorCode::AmountTooLarge => (
                "Summa ruxsat etilganidan ko'p",
                "Сумма больше допустимой",
                "Amount is too large",
            ),
            ErrorCode::MerchantServiceUnavailable => (
                "Kassa xizmati mavjud emas",
                "Сервис кассы недоступен",
                "Merchant service unavailable",
            ),
            ErrorCode::MerchantServiceIncorrect => (
                "Kassa xizmati noto'g'ri javob qaytardi",
                "Сервис кассы ответил некорректно",
                "Merchant service responded incorrectly",
            ),
            ErrorCode::CardError => (
                "Karta bilan bog'liq xatolik",
                "Ошибка карты",
                "Card error",
            ),
        };
        LocalizedMessage { uz, ru, en }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: LocalizedMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode) -> Self {
        RpcError {
            code: code.code(),
            message: code.message(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        RpcError::new(ErrorCode::InvalidParams).with_data(detail.into())
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code.code()
    }
}

impl From<AppError> for RpcError {
    fn from(err: AppError) -> Self {
        tracing::error!("Internal failure surfaced as RPC error: {}", err);
        RpcError::new(ErrorCode::InternalError)
    }
}

impl From<RepositoryError> for RpcError {
    fn from(err: RepositoryError) -> Self {
        AppError::from(err).into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        RpcResponse {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: Value, outcome: Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        }
    }
}
