//! Gateway error and reject code labels, as documented by the gateway.

pub const UNKNOWN_CODE_LABEL: &str = "Неизвестная ошибка";

/// Label for a `pg_error_code` returned by the gateway API.
pub fn error_code_label(code: u32) -> &'static str {
    match code {
        100 => "Некорректная подпись запроса *",
        101 => "Неверный номер магазина",
        110 => "Отсутствует или не действует контракт с магазином",
        120 => "Запрошенное действие отключено в настройках магазина",
        200 => "Не хватает или некорректный параметр запроса",
        340 => "Транзакция не найдена",
        350 => "Транзакция заблокирована",
        360 => "Транзакция просрочена",
        400 => "Платеж отменен покупателем или платежной системой",
        420 => "Платеж отменен по причине превышения лимита",
        490 => "Отмена платежа невозможна",
        600 => "Общая ошибка",
        700 => "Ошибка в данных введенных покупателем",
        701 => "Некорректный номер телефона",
        711 => "Номер телефона неприемлем для выбранной ПС",
        1000 => "Внутренняя ошибка сервиса (может не повториться при повторном обращении)",
        _ => UNKNOWN_CODE_LABEL,
    }
}

/// Label for a `pg_failure_code` carried by a failed payment notification.
pub fn reject_code_label(code: u32) -> &'static str {
    match code {
        1 => "Неизвестная причина отказа",
        2 => "Общая ошибка",
        3 => "Ошибка на стороне платежной системы",
        4 => "Не удалось выставить счет ни в одну из платежных систем",
        5 => "Неправильный запрос в платежную систему",
        40 => "Превышение лимитов",
        50 => "Платеж отменен",
        100 => "Ошибка в данных покупателя",
        101 => "Некорректный номер телефона",
        300 => "Некорректная транзакция",
        301 => "Неверный номер карты",
        302 => "Неверное имя держателя карты",
        303 => "Неверное значение CVV2/CVC2",
        304 => "Неверный срок действия карты",
        305 => "Данный вид карты не поддерживается банком",
        306 => "Некорректная сумма",
        310 => "Карта клиента просрочена",
        320 => "Ожидаемый fraud",
        321 => "Не пройдена аутентификация по 3ds51",
        329 => "Карта была украдена",
        330 => "Неизвестный банк эквайер",
        350 => "Превышение количества использований карты клиента за определенный промежуток времени",
        351 => "Превышение лимита по сумме",
        352 => "На счете клиента не хватает средств",
        353 => "Транзакция не разрешена для владельца карты",
        354 => "Транзакция не разрешена для банка эквайера",
        389 => "Общая техническая ошибка системы",
        390 => "Ограничения по карте",
        391 => "Карта заблокирована",
        400 => "Транзакция заблокирована по решению fraud-фильтров",
        410 => "Клиент не подтвердил свой номер телефона",
        _ => UNKNOWN_CODE_LABEL,
    }
}
