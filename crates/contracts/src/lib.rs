//! Общие типы backend и клиентов: агрегаты и контракты UseCase

pub mod domain;
pub mod usecases;
